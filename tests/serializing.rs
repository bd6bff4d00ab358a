// Basic tests for the serialization support and the builder API

pub mod common;
use fs_err as fs;
use std::time::Duration;
use chrono::prelude::*;
use pretty_assertions::assert_eq;
use dash_mpd_builder::{parse, MPD, Period, DashProfile, AudioChannelConfigurationScheme, DashMpdError};
use dash_mpd_builder::{MIME_TYPE_AUDIO_MP4, MIME_TYPE_VIDEO_MP4, MIME_TYPE_SUBTITLE_VTT, ROLE_SCHEME_ID_URI};
use common::{setup_logging, fixture_path};


const VALID_DEFAULT_KID_HEX: &str = "08e367028f33436ca5dd60ffe5571e60";
const VALID_INIT_PATH_AUDIO: &str = "$RepresentationID$/audio/en/init.mp4";
const VALID_MEDIA_PATH_AUDIO: &str = "$RepresentationID$/audio/en/seg-$Number$.m4f";
const VALID_INIT_PATH_VIDEO: &str = "$RepresentationID$/video/1/init.mp4";
const VALID_MEDIA_PATH_VIDEO: &str = "$RepresentationID$/video/1/seg-$Number$.m4f";


// The manifest of a live stream with one audio and one video AdaptationSet.
fn live_profile_mpd() -> MPD {
    let mut mpd = MPD::new_static(DashProfile::Live, "PT6M16S", "PT1.97S").unwrap();
    let audio = mpd.add_new_adaptation_set_audio(MIME_TYPE_AUDIO_MP4, true, 1, "und");
    audio.set_new_segment_template(1968, VALID_INIT_PATH_AUDIO, VALID_MEDIA_PATH_AUDIO, 0, 1000);
    audio.add_new_representation_audio(44100, 67095, "mp4a.40.2", "800");
    let video = mpd.add_new_adaptation_set_video(MIME_TYPE_VIDEO_MP4, "progressive", true, 1);
    video.set_new_segment_template(1968, VALID_INIT_PATH_VIDEO, VALID_MEDIA_PATH_VIDEO, 0, 1000);
    video.add_new_representation_video(1518664, "avc1.4d401f", "800", "30000/1001", 960, 540);
    mpd
}


#[test]
fn test_serialize () {
    setup_logging();
    let period = Period {
        id: Some("randomcookie".to_string()),
        duration: Some(Duration::new(420, 69)),
        ..Default::default()
    };
    let mpd = MPD {
        mpdtype: Some("static".to_string()),
        xmlns: Some("urn:mpeg:dash:schema:mpd:2011".to_string()),
        periods: vec!(period),
        publishTime: Some(Utc.with_ymd_and_hms(2017, 5, 25, 11, 11, 0).unwrap()),
        ..Default::default()
    };
    let xml = mpd.to_string();
    assert!(xml.starts_with("<MPD"));
    assert!(xml.contains("urn:mpeg:dash:schema"));
    assert!(xml.contains("randomcookie"));
    assert!(xml.contains("2017-05-25T11:11"));
    assert!(xml.contains(r#"duration="PT7M0.000000069S""#));
    let roundtripped = parse(&xml).unwrap();
    assert_eq!(roundtripped.periods[0].duration, Some(Duration::new(420, 69)));
}

#[test]
fn test_write_live_profile () {
    setup_logging();
    let xml = live_profile_mpd().write_to_string().unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(xml.ends_with("</MPD>\n"));
    for expected in [
        r#"xmlns="urn:mpeg:dash:schema:mpd:2011""#,
        r#"profiles="urn:mpeg:dash:profile:isoff-live:2011""#,
        r#"type="static""#,
        r#"mediaPresentationDuration="PT6M16S""#,
        r#"minBufferTime="PT1.97S""#,
        r#"<AdaptationSet lang="und" mimeType="audio/mp4" segmentAlignment="true" startWithSAP="1">"#,
        r#"<AdaptationSet mimeType="video/mp4" scanType="progressive" segmentAlignment="true" startWithSAP="1">"#,
        r#"<SegmentTemplate duration="1968" initialization="$RepresentationID$/audio/en/init.mp4" media="$RepresentationID$/audio/en/seg-$Number$.m4f" startNumber="0" timescale="1000"/>"#,
        r#"<Representation id="800" bandwidth="67095" codecs="mp4a.40.2" audioSamplingRate="44100"/>"#,
        r#"<Representation id="800" bandwidth="1518664" codecs="avc1.4d401f" width="960" height="540" frameRate="30000/1001"/>"#,
    ] {
        assert!(xml.contains(expected), "missing {expected} in {xml}");
    }
    // no Period attributes were set
    assert!(xml.contains("<Period>"));
}

#[test]
fn test_write_on_demand_profile () {
    setup_logging();
    let mut mpd = MPD::new_static(DashProfile::OnDemand, "PT30S", "PT1.97S").unwrap();
    let audio = mpd.add_new_adaptation_set_audio_with_id("7357", MIME_TYPE_AUDIO_MP4, true, 1, "en");
    audio.add_new_role(ROLE_SCHEME_ID_URI, "main");
    let r = audio.add_new_representation_audio(44100, 128558, "mp4a.40.5", "800k/audio");
    r.set_new_base_url("800k/output-audio-und.mp4").unwrap();
    r.add_new_segment_base("629-756", "0-628");
    r.add_new_audio_channel_configuration(AudioChannelConfigurationScheme::Dolby, "F801");
    let subs = mpd.add_new_adaptation_set_subtitle(MIME_TYPE_SUBTITLE_VTT, "en");
    let sr = subs.add_new_representation_subtitle(256, "subtitle_en");
    sr.set_new_base_url("http://example.com/content/sintel/subtitles/subtitles_en.vtt").unwrap();
    let xml = mpd.write_to_string().unwrap();
    assert!(xml.contains(r#"profiles="urn:mpeg:dash:profile:isoff-on-demand:2011""#));
    assert!(xml.contains(r#"<AdaptationSet id="7357" lang="en""#));
    assert!(xml.contains(r#"<Role schemeIdUri="urn:mpeg:dash:role:2011" value="main"/>"#));
    assert!(xml.contains(r#"<AudioChannelConfiguration schemeIdUri="tag:dolby.com,2014:dash:audio_channel_configuration:2011" value="F801"/>"#));
    assert!(xml.contains("<BaseURL>800k/output-audio-und.mp4</BaseURL>"));
    assert!(xml.contains(r#"<SegmentBase indexRange="629-756">"#));
    assert!(xml.contains(r#"<Initialization range="0-628"/>"#));
    assert!(xml.contains(r#"<AdaptationSet lang="en" mimeType="text/vtt">"#));
    assert!(xml.contains(r#"<Representation id="subtitle_en" bandwidth="256">"#));
}

#[test]
fn test_write_dynamic () {
    setup_logging();
    let mut mpd = MPD::new_dynamic(DashProfile::HbbTv15Live, "1970-01-01T00:00:00Z", "PT2S").unwrap();
    mpd.add_new_adaptation_set_video_with_id("1", MIME_TYPE_VIDEO_MP4, "progressive", true, 1);
    let xml = mpd.write_to_string().unwrap();
    assert!(xml.contains(r#"type="dynamic""#));
    assert!(xml.contains(r#"availabilityStartTime="1970-01-01T00:00:00Z""#));
    assert!(xml.contains("urn:hbbtv:dash:profile:isoff-live:2012,urn:mpeg:dash:profile:isoff-live:2011"));
    assert!(xml.contains("<UTCTiming/>"));
    assert!(!xml.contains("mediaPresentationDuration"));
}

#[test]
fn test_multiple_periods () {
    setup_logging();
    let mut mpd = live_profile_mpd();
    mpd.periods[0].id = Some(String::from("0"));
    mpd.periods[0].set_duration(Duration::from_secs(30));
    let p = mpd.add_new_period();
    p.id = Some(String::from("1"));
    mpd.add_new_adaptation_set_subtitle_with_id("3", MIME_TYPE_SUBTITLE_VTT, "fr");
    let xml = mpd.write_to_string().unwrap();
    assert!(xml.contains(r#"<Period id="0" duration="PT30S">"#));
    assert!(xml.contains(r#"<Period id="1">"#));
    let mpd = parse(&xml).unwrap();
    assert_eq!(mpd.periods.len(), 2);
    assert_eq!(mpd.periods[0].adaptations.len(), 2);
    assert_eq!(mpd.periods[1].adaptations[0].lang.as_deref(), Some("fr"));
}

#[test]
fn test_builder_errors () {
    setup_logging();
    assert!(matches!(MPD::new_static(DashProfile::Live, "PT6M16", "PT1.97S"),
                     Err(DashMpdError::InvalidDuration(_))));
    assert!(matches!(MPD::new_dynamic(DashProfile::Live, "1970-01-01T00:00:00Z", "-PT2S"),
                     Err(DashMpdError::InvalidDuration(_))));
    let mut mpd = live_profile_mpd();
    let r = &mut mpd.periods[0].adaptations[0].representations[0];
    assert!(matches!(r.set_new_base_url(""), Err(DashMpdError::EmptyBaseURL)));
    assert!(r.BaseURL.is_empty());
}

#[test]
fn test_roundtrip_fixture () {
    setup_logging();
    let mpd = MPD::read_from_file(fixture_path("multi-drm.mpd")).unwrap();
    let xml = mpd.write_to_string().unwrap();
    // the ClearKey descriptor keeps its vendor namespace
    assert!(xml.contains(r#"dashif:laurl="https://clearkey.example.com/license""#));
    assert!(xml.contains(r#"<dashif:Laurl Lic_type="EME-1.0">https://clearkey.example.com/license</dashif:Laurl>"#));
    let reparsed = parse(&xml).unwrap();
    assert_eq!(mpd, reparsed);
}

#[test]
fn test_write_to_file () {
    setup_logging();
    let tmpd = tempfile::tempdir().unwrap();
    let out = tmpd.path().join("live.mpd");
    let mpd = live_profile_mpd();
    mpd.write_to_file(&out).unwrap();
    let contents = fs::read_to_string(&out).unwrap();
    assert_eq!(contents, mpd.write_to_string().unwrap());
    let back = MPD::read_from_file(&out).unwrap();
    assert_eq!(back, mpd);

    let bad = tmpd.path().join("missing-dir").join("live.mpd");
    assert!(matches!(mpd.write_to_file(bad), Err(DashMpdError::Io(_, _))));
}
