// Tests for the parsing support
//
// To run this test while enabling printing to stdout/stderr
//
//    cargo test --test parsing -- --show-output


pub mod common;
use fs_err as fs;
use std::time::Duration;
use pretty_assertions::assert_eq;
use dash_mpd_builder::{parse, MPD, ProtectionScheme, PlayReadyVersion, ExtraAttribute, DashMpdError};
use dash_mpd_builder::{is_audio_adaptation, is_video_adaptation, is_subtitle_adaptation};
use dash_mpd_builder::content_protection::{WIDEVINE_SCHEME_ID_URI, PLAYREADY_SCHEME_ID_URI};
use dash_mpd_builder::pssh::WIDEVINE_SYSTEM_ID;
use common::{setup_logging, fixture_path};


#[test]
fn test_mpd_parser () {
    setup_logging();
    let case1 = r#"<?xml version="1.0" encoding="UTF-8"?><MPD><Period></Period></MPD>"#;
    let mpd = parse(case1).unwrap();
    assert_eq!(mpd.periods.len(), 1);
    assert!(mpd.ProgramInformation.is_none());

    let case2 = r#"<?xml version="1.0" encoding="UTF-8"?><MPD foo="foo"><Period></Period><foo></foo></MPD>"#;
    let mpd = parse(case2).unwrap();
    assert_eq!(mpd.periods.len(), 1);

    let case3 = r#"<?xml version="1.0" encoding="UTF-8"?><MPD><Period></PeriodZ></MPD>"#;
    assert!(matches!(parse(case3), Err(DashMpdError::Parsing(_))));

    let case4 = r#"<MPD>
                     <BaseURL>http://cdn1.example.com/</BaseURL>
                     <BaseURL>http://cdn2.example.com/</BaseURL>
                   </MPD>"#;
    let mpd = parse(case4).unwrap();
    assert_eq!(mpd.base_url.len(), 2);
    assert_eq!(mpd.base_url[1].base, "http://cdn2.example.com/");

    let case5 = r#"<MPD type="static" minBufferTime="PT1S">
    <Period duration="PT2S">
      <AdaptationSet mimeType="video/mp4">
        <Representation bandwidth="42" id="3"></Representation>
      </AdaptationSet>
    </Period></MPD>"#;
    let mpd = parse(case5).unwrap();
    assert_eq!(mpd.mpdtype.as_deref(), Some("static"));
    assert_eq!(mpd.minBufferTime, Some(Duration::new(1, 0)));
    let p1 = &mpd.periods[0];
    assert_eq!(p1.duration, Some(Duration::new(2, 0)));
    let a1 = &p1.adaptations[0];
    assert_eq!(a1.mimeType.as_deref(), Some("video/mp4"));
    assert_eq!(a1.representations[0].bandwidth, Some(42));

    // This example uses single quotes instead of double quotes in XML formatting.
    let case6 = r#"<?xml version='1.0' encoding='UTF-8'?><MPD
       minBufferTime='PT10.00S'
       mediaPresentationDuration='PT3256S'
       type='static' availabilityStartTime='2001-12-17T09:40:57Z'
       profiles='urn:mpeg:dash:profile:isoff-main:2011'>
     <Period start='PT0S' id='1'>
       <AdaptationSet group='1'>
         <Representation mimeType='video/mp4' codecs='avc1.644028, svc1' width='320' height='240'
           frameRate='15' id='tag0' bandwidth='128000'>
           <SegmentList duration='10'>
             <Initialization sourceURL='seg-s-init.mp4'/>
             <SegmentURL media='seg-s1-128k-1.mp4'/>
             <SegmentURL media='seg-s1-128k-2.mp4'/>
             <SegmentURL media='seg-s1-128k-3.mp4'/>
           </SegmentList>
         </Representation>
       </AdaptationSet>
     </Period></MPD>"#;
    let mpd = parse(case6).unwrap();
    assert_eq!(mpd.mediaPresentationDuration, Some(Duration::from_secs(3256)));
    let r = &mpd.periods[0].adaptations[0].representations[0];
    let sl = r.SegmentList.as_ref().unwrap();
    assert_eq!(sl.segment_urls.len(), 3);
    assert_eq!(sl.Initialization.as_ref().and_then(|i| i.sourceURL.as_deref()), Some("seg-s-init.mp4"));
}

// Manifests that contain XML elements for which we don't have definitions should parse, ignoring
// the unknown elements.
#[test]
fn test_unknown_elements () {
    setup_logging();
    let case1 = r#"<MPD><UnknownElement/></MPD>"#;
    assert_eq!(parse(case1).unwrap().periods.len(), 0);

    let case2 = r#"<MPD><uprefix:UnknownElement></uprefix:UnknownElement></MPD>"#;
    assert_eq!(parse(case2).unwrap().periods.len(), 0);

    let case3 = r#"<MPD><Period><AdaptationSet>
        <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc">
          <cenc:unknown>whatever</cenc:unknown>
        </ContentProtection>
      </AdaptationSet></Period></MPD>"#;
    let mpd = parse(case3).unwrap();
    let cp = &mpd.periods[0].adaptations[0].ContentProtection[0];
    assert_eq!(cp.scheme, ProtectionScheme::Cenc { default_KID: None });
}

#[test]
fn test_duration_attributes () {
    setup_logging();
    let mpd = parse(r#"<MPD minBufferTime="PT1.500S" mediaPresentationDuration="P1DT2H"></MPD>"#).unwrap();
    assert_eq!(mpd.minBufferTime.unwrap().as_millis(), 1500);
    assert_eq!(mpd.mediaPresentationDuration, Some(Duration::from_secs(26 * 3600)));

    // Years and months have no fixed length in seconds.
    let err = parse(r#"<MPD mediaPresentationDuration="P1Y"></MPD>"#).unwrap_err();
    assert!(err.to_string().contains("P[nD][T[nH][nM][nS]]"), "{err}");
    assert!(parse(r#"<MPD><Period duration="-PT5S"/></MPD>"#).is_err());
    assert!(parse(r#"<MPD minBufferTime="P"></MPD>"#).is_err());
}

#[test]
fn test_datetime_parsing () {
    use chrono::{Timelike, Datelike};

    setup_logging();
    // an xs:datetime without a specified timezone
    let mpd = parse(r#"<MPD availabilityStartTime="2022-12-06T22:27:53"></MPD>"#).unwrap();
    let ast = mpd.availabilityStartTime.unwrap();
    assert_eq!(ast.year(), 2022);
    assert_eq!(ast.hour(), 22);
    assert_eq!(ast.second(), 53);

    let mpd = parse(r#"<MPD availabilityStartTime="2015-11-03T21:56"></MPD>"#).unwrap();
    let ast = mpd.availabilityStartTime.unwrap();
    assert_eq!(ast.day(), 3);
    assert_eq!(ast.minute(), 56);

    let mpd = parse(r#"<MPD availabilityStartTime="2021-06-03T13:00:00.543343989Z"></MPD>"#).unwrap();
    assert_eq!(mpd.availabilityStartTime.unwrap().nanosecond(), 543343989);

    // month number 14
    assert!(parse(r#"<MPD availabilityStartTime="1066-14-03T21:56"></MPD>"#).is_err());
}

#[test]
fn test_multi_drm_fixture () {
    setup_logging();
    let mpd = MPD::read_from_file(fixture_path("multi-drm.mpd")).unwrap();
    assert_eq!(mpd.xmlns_cenc.as_deref(), Some("urn:mpeg:cenc:2013"));
    assert_eq!(mpd.xmlns_mspr.as_deref(), Some("urn:microsoft:playready"));
    assert_eq!(mpd.mediaPresentationDuration, Some(Duration::from_secs(376)));
    let period = &mpd.periods[0];
    assert_eq!(period.start, Some(Duration::ZERO));
    assert_eq!(period.adaptations.len(), 3);

    let video = &period.adaptations[0];
    assert!(is_video_adaptation(video));
    assert_eq!(video.ContentProtection.len(), 4);
    let cps = &video.ContentProtection;

    // KID normalized to lowercase
    assert_eq!(cps[0].default_kid(), Some("08e36702-8f33-436c-a5dd-60ffe5571e60"));
    assert_eq!(cps[0].value.as_deref(), Some("cenc"));
    assert!(cps[0].extra_attributes.is_empty());

    // scheme matched case-insensitively, original spelling preserved
    assert!(cps[1].schemeIdUri.eq_ignore_ascii_case(WIDEVINE_SCHEME_ID_URI));
    assert_eq!(cps[1].value.as_deref(), Some("Widevine"));
    assert_eq!(cps[1].system_id(), Some(WIDEVINE_SYSTEM_ID));
    assert!(cps[1].pssh().unwrap().starts_with("AAAAYXBzc2gAAAAA7e+LqXnWSs6jyCfc1R0h7Q"));

    assert_eq!(cps[2].schemeIdUri, PLAYREADY_SCHEME_ID_URI);
    match &cps[2].scheme {
        ProtectionScheme::PlayReady(pr) => {
            assert_eq!(pr.version, PlayReadyVersion::Current);
            assert_eq!(pr.pro.as_deref(), Some("BgIAAAEAAQD8ATwAVwBSAE0ASABFAEEARABFAFIA"));
            assert_eq!(pr.kid.as_deref(), Some("AmfjCTOPbEOl3WD/5mcecA=="));
            assert_eq!(pr.isEncrypted, Some(1));
            assert_eq!(pr.IV_Size, Some(8));
            assert!(pr.pssh.is_none());
        },
        other => panic!("expecting PlayReady descriptor, got {other:?}"),
    }

    // ClearKey is not a scheme we know about: generic, keeping its pssh and attributes
    assert_eq!(cps[3].value.as_deref(), Some("ClearKey1.0"));
    assert!(matches!(cps[3].scheme, ProtectionScheme::Generic { pssh: Some(_), .. }));
    assert_eq!(cps[3].extra_attributes, vec![
        ExtraAttribute::new(Some("xmlns"), "dashif", "https://dashif.org/CPS"),
        ExtraAttribute::new(Some("dashif"), "laurl", "https://clearkey.example.com/license"),
    ]);
    if let ProtectionScheme::Generic { elements, .. } = &cps[3].scheme {
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].qualified_name(), "dashif:Laurl");
        assert_eq!(elements[0].attributes, vec![ExtraAttribute::new(None, "Lic_type", "EME-1.0")]);
        assert_eq!(elements[0].text, "https://clearkey.example.com/license");
    }
    assert!(cps[3].system_id().is_none());

    let st = video.SegmentTemplate.as_ref().unwrap();
    assert_eq!(st.duration, Some(1968));
    assert_eq!(st.timescale, Some(1000));
    assert_eq!(video.representations[1].width, Some(1280));

    let audio = &period.adaptations[1];
    assert!(is_audio_adaptation(audio));
    assert_eq!(audio.Role[0].value.as_deref(), Some("main"));
    let ar = &audio.representations[0];
    assert_eq!(ar.audioSamplingRate, Some(44100));
    assert_eq!(ar.AudioChannelConfiguration[0].value.as_deref(), Some("2"));
    assert_eq!(ar.BaseURL[0].base, "800k/output-audio-1.mp4");
    let sb = ar.SegmentBase.as_ref().unwrap();
    assert_eq!(sb.indexRange.as_deref(), Some("629-756"));
    assert_eq!(sb.Initialization.as_ref().and_then(|i| i.range.as_deref()), Some("0-628"));

    let subs = &period.adaptations[2];
    assert!(is_subtitle_adaptation(subs));
    assert!(subs.id.is_none());
    assert_eq!(subs.representations[0].id.as_deref(), Some("subtitle_en"));
}

#[test]
fn test_live_fixture () {
    setup_logging();
    let xml = fs::read_to_string(fixture_path("live-scte35.mpd")).unwrap();
    let mpd = MPD::read_from_string(&xml).unwrap();
    assert_eq!(mpd.mpdtype.as_deref(), Some("dynamic"));
    assert_eq!(mpd.schemaLocation.as_deref(), Some("urn:mpeg:dash:schema:mpd:2011 DASH-MPD.xsd"));
    assert_eq!(mpd.minimumUpdatePeriod, Some(Duration::from_secs(6)));
    assert_eq!(mpd.timeShiftBufferDepth, Some(Duration::from_secs(300)));
    assert_eq!(mpd.suggestedPresentationDelay, Some(Duration::from_secs(10)));
    assert_eq!(mpd.maxSegmentDuration, Some(Duration::from_secs(2)));
    assert_eq!(mpd.publishTime.map(|t| t.to_rfc3339()), Some(String::from("2022-12-06T22:30:00+00:00")));
    assert_eq!(mpd.UTCTiming.len(), 1);
    let period = &mpd.periods[0];
    let st = period.adaptations[0].SegmentTemplate.as_ref().unwrap();
    let tl = st.SegmentTimeline.as_ref().unwrap();
    assert_eq!(tl.segments.len(), 2);
    assert_eq!(tl.segments[0].r, Some(4));
    assert_eq!(tl.segments[1].t, None);
    assert_eq!(period.event_streams.len(), 1);
    let ev = &period.event_streams[0].events[0];
    assert_eq!(ev.presentationTime, Some(900000));
    assert_eq!(ev.duration, Some(2700000));
}

#[test]
fn test_read_missing_file () {
    setup_logging();
    let res = MPD::read_from_file(fixture_path("does-not-exist.mpd"));
    match res {
        // the underlying error names the file
        Err(DashMpdError::Io(e, _)) => assert!(e.to_string().contains("does-not-exist.mpd"), "{e}"),
        other => panic!("expecting an I/O error, got {other:?}"),
    }
}
