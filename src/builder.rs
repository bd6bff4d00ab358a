// Builder methods for programmatic generation of a manifest.
//
// An MPD is built top down: the constructor creates the first Period, adaptation sets are added to
// the current (last) Period, and each add_* / set_* method returns a mutable reference to the node
// it created so that the caller can keep filling it in.

use std::time::Duration;
use tracing::trace;
use crate::{
    parse_xs_duration, parse_xs_datetime, DashMpdError, MPD, Period, AdaptationSet, Representation,
    SegmentTemplate, SegmentBase, Initialization, BaseURL, Descriptor, ContentProtection,
    PlayReadyVersion,
};


/// Namespace of MPD documents.
pub const DASH_XMLNS: &str = "urn:mpeg:dash:schema:mpd:2011";

pub const MIME_TYPE_VIDEO_MP4: &str = "video/mp4";
pub const MIME_TYPE_AUDIO_MP4: &str = "audio/mp4";
pub const MIME_TYPE_SUBTITLE_VTT: &str = "text/vtt";
pub const MIME_TYPE_TTML: &str = "application/ttaf+xml";
pub const MIME_TYPE_SUBRIP: &str = "application/x-subrip";
pub const MIME_TYPE_DFXP: &str = "application/dfxp+xml";

/// Scheme of the `Role` descriptor defined in ISO/IEC 23009-1.
pub const ROLE_SCHEME_ID_URI: &str = "urn:mpeg:dash:role:2011";


/// The DASH profile of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashProfile {
    /// urn:mpeg:dash:profile:isoff-live:2011
    Live,
    /// urn:mpeg:dash:profile:isoff-on-demand:2011
    OnDemand,
    /// The HbbTV 1.5 live profile, which is a restriction of isoff-live.
    HbbTv15Live,
}

impl DashProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashProfile::Live => "urn:mpeg:dash:profile:isoff-live:2011",
            DashProfile::OnDemand => "urn:mpeg:dash:profile:isoff-on-demand:2011",
            DashProfile::HbbTv15Live =>
                "urn:hbbtv:dash:profile:isoff-live:2012,urn:mpeg:dash:profile:isoff-live:2011",
        }
    }
}

/// Schemes for the `AudioChannelConfiguration` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioChannelConfigurationScheme {
    /// Channel count, as per ISO/IEC 23003-3.
    Mpeg,
    /// Dolby channel mask, for AC-3 and E-AC-3 streams.
    Dolby,
}

impl AudioChannelConfigurationScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioChannelConfigurationScheme::Mpeg =>
                "urn:mpeg:dash:23003:3:audio_channel_configuration:2011",
            AudioChannelConfigurationScheme::Dolby =>
                "tag:dolby.com,2014:dash:audio_channel_configuration:2011",
        }
    }
}


impl MPD {
    fn with_profile(profile: DashProfile, mpdtype: &str, min_buffer_time: &str) -> Result<MPD, DashMpdError> {
        Ok(MPD {
            xmlns: Some(String::from(DASH_XMLNS)),
            profiles: Some(String::from(profile.as_str())),
            mpdtype: Some(String::from(mpdtype)),
            minBufferTime: Some(parse_xs_duration(min_buffer_time)?),
            periods: vec!(Period::default()),
            ..Default::default()
        })
    }

    /// A static (on-demand) manifest, with one empty Period.
    ///
    /// `media_presentation_duration` and `min_buffer_time` are durations such as `PT6M16S` and
    /// `PT1.97S`.
    pub fn new_static(
        profile: DashProfile,
        media_presentation_duration: &str,
        min_buffer_time: &str) -> Result<MPD, DashMpdError>
    {
        let mut mpd = MPD::with_profile(profile, "static", min_buffer_time)?;
        mpd.mediaPresentationDuration = Some(parse_xs_duration(media_presentation_duration)?);
        Ok(mpd)
    }

    /// A dynamic (live) manifest, with one empty Period and an empty `UTCTiming` element.
    ///
    /// `availability_start_time` is an xs:dateTime such as `2021-06-03T13:00:00Z`.
    pub fn new_dynamic(
        profile: DashProfile,
        availability_start_time: &str,
        min_buffer_time: &str) -> Result<MPD, DashMpdError>
    {
        let mut mpd = MPD::with_profile(profile, "dynamic", min_buffer_time)?;
        mpd.availabilityStartTime = Some(parse_xs_datetime(availability_start_time)?);
        mpd.UTCTiming.push(Descriptor::default());
        Ok(mpd)
    }

    /// Append a new Period, which becomes the current Period.
    pub fn add_new_period(&mut self) -> &mut Period {
        self.periods.push(Period::default());
        trace!("MPD now has {} periods", self.periods.len());
        self.current_period_mut()
    }

    /// The current (most recently added) Period, if any.
    pub fn current_period(&self) -> Option<&Period> {
        self.periods.last()
    }

    /// The current (most recently added) Period. A Period is created if the manifest has none.
    pub fn current_period_mut(&mut self) -> &mut Period {
        if self.periods.is_empty() {
            self.periods.push(Period::default());
        }
        let last = self.periods.len() - 1;
        &mut self.periods[last]
    }

    pub fn add_new_adaptation_set_audio(
        &mut self,
        mime_type: &str,
        segment_alignment: bool,
        start_with_sap: u64,
        lang: &str) -> &mut AdaptationSet
    {
        self.current_period_mut()
            .add_new_adaptation_set_audio(mime_type, segment_alignment, start_with_sap, lang)
    }

    pub fn add_new_adaptation_set_audio_with_id(
        &mut self,
        id: &str,
        mime_type: &str,
        segment_alignment: bool,
        start_with_sap: u64,
        lang: &str) -> &mut AdaptationSet
    {
        self.current_period_mut()
            .add_new_adaptation_set_audio_with_id(id, mime_type, segment_alignment, start_with_sap, lang)
    }

    pub fn add_new_adaptation_set_video(
        &mut self,
        mime_type: &str,
        scan_type: &str,
        segment_alignment: bool,
        start_with_sap: u64) -> &mut AdaptationSet
    {
        self.current_period_mut()
            .add_new_adaptation_set_video(mime_type, scan_type, segment_alignment, start_with_sap)
    }

    pub fn add_new_adaptation_set_video_with_id(
        &mut self,
        id: &str,
        mime_type: &str,
        scan_type: &str,
        segment_alignment: bool,
        start_with_sap: u64) -> &mut AdaptationSet
    {
        self.current_period_mut()
            .add_new_adaptation_set_video_with_id(id, mime_type, scan_type, segment_alignment, start_with_sap)
    }

    pub fn add_new_adaptation_set_subtitle(&mut self, mime_type: &str, lang: &str) -> &mut AdaptationSet {
        self.current_period_mut().add_new_adaptation_set_subtitle(mime_type, lang)
    }

    pub fn add_new_adaptation_set_subtitle_with_id(&mut self, id: &str, mime_type: &str, lang: &str) -> &mut AdaptationSet {
        self.current_period_mut().add_new_adaptation_set_subtitle_with_id(id, mime_type, lang)
    }
}


impl Period {
    pub fn set_duration(&mut self, d: Duration) {
        self.duration = Some(d);
    }

    fn add_adaptation_set(&mut self, a: AdaptationSet) -> &mut AdaptationSet {
        self.adaptations.push(a);
        let last = self.adaptations.len() - 1;
        &mut self.adaptations[last]
    }

    /// Add an AdaptationSet for audio content, such as `audio/mp4` in language `lang`.
    pub fn add_new_adaptation_set_audio(
        &mut self,
        mime_type: &str,
        segment_alignment: bool,
        start_with_sap: u64,
        lang: &str) -> &mut AdaptationSet
    {
        self.add_adaptation_set(AdaptationSet {
            mimeType: Some(String::from(mime_type)),
            segmentAlignment: Some(segment_alignment),
            startWithSAP: Some(start_with_sap),
            lang: Some(String::from(lang)),
            ..Default::default()
        })
    }

    pub fn add_new_adaptation_set_audio_with_id(
        &mut self,
        id: &str,
        mime_type: &str,
        segment_alignment: bool,
        start_with_sap: u64,
        lang: &str) -> &mut AdaptationSet
    {
        let a = self.add_new_adaptation_set_audio(mime_type, segment_alignment, start_with_sap, lang);
        a.id = Some(String::from(id));
        a
    }

    /// Add an AdaptationSet for video content. `scan_type` is usually `progressive`.
    pub fn add_new_adaptation_set_video(
        &mut self,
        mime_type: &str,
        scan_type: &str,
        segment_alignment: bool,
        start_with_sap: u64) -> &mut AdaptationSet
    {
        self.add_adaptation_set(AdaptationSet {
            mimeType: Some(String::from(mime_type)),
            scanType: Some(String::from(scan_type)),
            segmentAlignment: Some(segment_alignment),
            startWithSAP: Some(start_with_sap),
            ..Default::default()
        })
    }

    pub fn add_new_adaptation_set_video_with_id(
        &mut self,
        id: &str,
        mime_type: &str,
        scan_type: &str,
        segment_alignment: bool,
        start_with_sap: u64) -> &mut AdaptationSet
    {
        let a = self.add_new_adaptation_set_video(mime_type, scan_type, segment_alignment, start_with_sap);
        a.id = Some(String::from(id));
        a
    }

    /// Add an AdaptationSet for subtitles, such as `text/vtt` in language `lang`.
    pub fn add_new_adaptation_set_subtitle(&mut self, mime_type: &str, lang: &str) -> &mut AdaptationSet {
        self.add_adaptation_set(AdaptationSet {
            mimeType: Some(String::from(mime_type)),
            lang: Some(String::from(lang)),
            ..Default::default()
        })
    }

    pub fn add_new_adaptation_set_subtitle_with_id(&mut self, id: &str, mime_type: &str, lang: &str) -> &mut AdaptationSet {
        let a = self.add_new_adaptation_set_subtitle(mime_type, lang);
        a.id = Some(String::from(id));
        a
    }
}


impl AdaptationSet {
    /// Append a ContentProtection descriptor.
    pub fn add_content_protection(&mut self, cp: ContentProtection) -> &mut ContentProtection {
        self.ContentProtection.push(cp);
        let last = self.ContentProtection.len() - 1;
        &mut self.ContentProtection[last]
    }

    /// Add the root Common Encryption descriptor, which signals that the content is encrypted with
    /// key ID `default_kid_hex` (32 hex digits) independently of any particular DRM system.
    pub fn add_new_content_protection_root(&mut self, default_kid_hex: &str) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::cenc_root(default_kid_hex)?;
        Ok(self.add_content_protection(cp))
    }

    /// Add a Widevine descriptor without PSSH data.
    pub fn add_new_content_protection_scheme_widevine(&mut self) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::widevine(None)?;
        Ok(self.add_content_protection(cp))
    }

    /// Add a Widevine descriptor with a `cenc:pssh` element containing a PSSH box wrapping the
    /// binary Widevine header `wv_header`. The header content is not checked.
    pub fn add_new_content_protection_scheme_widevine_with_pssh(&mut self, wv_header: &[u8]) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::widevine(Some(wv_header))?;
        Ok(self.add_content_protection(cp))
    }

    /// Add a PlayReady descriptor. `pro` is the Base64-encoded PlayReady Object.
    pub fn add_new_content_protection_scheme_playready(&mut self, pro: &str) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::playready(pro, PlayReadyVersion::Current, false)?;
        Ok(self.add_content_protection(cp))
    }

    /// Add a PlayReady descriptor using the PlayReady 1.0 system ID.
    pub fn add_new_content_protection_scheme_playready_v10(&mut self, pro: &str) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::playready(pro, PlayReadyVersion::V10, false)?;
        Ok(self.add_content_protection(cp))
    }

    /// Add a PlayReady descriptor with both `mspr:pro` and `cenc:pssh` elements.
    pub fn add_new_content_protection_scheme_playready_with_pssh(&mut self, pro: &str) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::playready(pro, PlayReadyVersion::Current, true)?;
        Ok(self.add_content_protection(cp))
    }

    pub fn add_new_content_protection_scheme_playready_v10_with_pssh(&mut self, pro: &str) -> Result<&mut ContentProtection, DashMpdError> {
        let cp = ContentProtection::playready(pro, PlayReadyVersion::V10, true)?;
        Ok(self.add_content_protection(cp))
    }

    /// Set the SegmentTemplate of this AdaptationSet, replacing any existing one.
    ///
    /// `duration` is expressed in units of `timescale` (so 1968 with a timescale of 1000 is 1.968
    /// seconds); `init` and `media` are URL templates such as
    /// `$RepresentationID$/audio/en/seg-$Number$.m4f`.
    pub fn set_new_segment_template(
        &mut self,
        duration: u64,
        init: &str,
        media: &str,
        start_number: u64,
        timescale: u64) -> &mut SegmentTemplate
    {
        self.SegmentTemplate.insert(SegmentTemplate {
            duration: Some(duration),
            initialization: Some(String::from(init)),
            media: Some(String::from(media)),
            startNumber: Some(start_number),
            timescale: Some(timescale),
            ..Default::default()
        })
    }

    fn add_representation(&mut self, r: Representation) -> &mut Representation {
        self.representations.push(r);
        let last = self.representations.len() - 1;
        &mut self.representations[last]
    }

    /// Add an audio Representation. `sampling_rate` is in Hz and `bandwidth` in bits per second.
    pub fn add_new_representation_audio(
        &mut self,
        sampling_rate: u64,
        bandwidth: u64,
        codecs: &str,
        id: &str) -> &mut Representation
    {
        self.add_representation(Representation {
            id: Some(String::from(id)),
            bandwidth: Some(bandwidth),
            codecs: Some(String::from(codecs)),
            audioSamplingRate: Some(sampling_rate),
            ..Default::default()
        })
    }

    /// Add a video Representation. `frame_rate` may be a fraction, such as `30000/1001`.
    pub fn add_new_representation_video(
        &mut self,
        bandwidth: u64,
        codecs: &str,
        id: &str,
        frame_rate: &str,
        width: u64,
        height: u64) -> &mut Representation
    {
        self.add_representation(Representation {
            id: Some(String::from(id)),
            bandwidth: Some(bandwidth),
            codecs: Some(String::from(codecs)),
            width: Some(width),
            height: Some(height),
            frameRate: Some(String::from(frame_rate)),
            ..Default::default()
        })
    }

    pub fn add_new_representation_subtitle(&mut self, bandwidth: u64, id: &str) -> &mut Representation {
        self.add_representation(Representation {
            id: Some(String::from(id)),
            bandwidth: Some(bandwidth),
            ..Default::default()
        })
    }

    /// Add a Role, such as `main`, `caption` or `commentary` in the `urn:mpeg:dash:role:2011`
    /// scheme.
    pub fn add_new_role(&mut self, scheme_id_uri: &str, value: &str) -> &mut Descriptor {
        self.Role.push(Descriptor {
            schemeIdUri: Some(String::from(scheme_id_uri)),
            value: Some(String::from(value)),
            id: None,
        });
        let last = self.Role.len() - 1;
        &mut self.Role[last]
    }
}


impl Representation {
    /// Set the BaseURL of this Representation, replacing any existing ones.
    pub fn set_new_base_url(&mut self, base_url: &str) -> Result<(), DashMpdError> {
        if base_url.is_empty() {
            return Err(DashMpdError::EmptyBaseURL);
        }
        self.BaseURL = vec!(BaseURL { base: String::from(base_url), ..Default::default() });
        Ok(())
    }

    /// Set the SegmentBase of this Representation (for the on-demand profile). `index_range` is the
    /// byte range of the segment index (sidx box) and `init_range` that of the initialization data
    /// (ftyp and moov boxes).
    pub fn add_new_segment_base(&mut self, index_range: &str, init_range: &str) -> &mut SegmentBase {
        self.SegmentBase.insert(SegmentBase {
            indexRange: Some(String::from(index_range)),
            Initialization: Some(Initialization {
                range: Some(String::from(init_range)),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Add an AudioChannelConfiguration descriptor (required by the HbbTV profile).
    pub fn add_new_audio_channel_configuration(
        &mut self,
        scheme: AudioChannelConfigurationScheme,
        channel_configuration: &str) -> &mut Descriptor
    {
        self.AudioChannelConfiguration.push(Descriptor {
            schemeIdUri: Some(String::from(scheme.as_str())),
            value: Some(String::from(channel_configuration)),
            id: None,
        });
        let last = self.AudioChannelConfiguration.len() - 1;
        &mut self.AudioChannelConfiguration[last]
    }
}
