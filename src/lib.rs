//! A Rust library for building, serializing and parsing DASH MPD manifests, with support for
//! signalling DRM protection. Allows programmatic generation of an MPD manifest for a live or
//! on-demand stream (serialization), and parsing of an existing manifest (XML format) to Rust
//! structs (deserialization).
//!
//! [DASH](https://en.wikipedia.org/wiki/Dynamic_Adaptive_Streaming_over_HTTP) (dynamic adaptive
//! streaming over HTTP), also called MPEG-DASH, is a technology used for media streaming over the
//! web, commonly used for video on demand (VOD) services and live TV. The Media Presentation
//! Description (MPD) is a description of the resources (manifest or “playlist”) forming a streaming
//! service, that a DASH client uses to determine which assets to request in order to perform
//! adaptive streaming of the content.
//!
//! ## Features
//!
//! - Builder methods for static (on-demand) and dynamic (live) manifests in the isoff-live,
//!   isoff-on-demand and HbbTV 1.5 profiles.
//! - Duration-typed attributes (`@mediaPresentationDuration`, `Period@duration` and so on) are
//!   parsed and formatted in the `P[nD][T[nH][nM][nS]]` subset of xs:duration used by DASH.
//! - `ContentProtection` descriptors for Common Encryption, Widevine and PlayReady are decoded to
//!   a typed representation, including generation of PSSH boxes. Descriptors for other DRM systems
//!   are kept with their namespace-qualified attributes and text-only child elements, so that they
//!   survive a parse/serialize round trip.
//! - SCTE-35 splice breaks carried in a Period `EventStream` (feature `scte35`).
//!
//! ## Example
//!
//! ```rust
//! use dash_mpd_builder::{MPD, DashProfile, MIME_TYPE_VIDEO_MP4};
//!
//! let mut mpd = MPD::new_static(DashProfile::Live, "PT6M16S", "PT1.97S").unwrap();
//! let video = mpd.add_new_adaptation_set_video(MIME_TYPE_VIDEO_MP4, "progressive", true, 1);
//! video.add_new_content_protection_root("08e367028f33436ca5dd60ffe5571e60").unwrap();
//! video.add_new_content_protection_scheme_widevine().unwrap();
//! video.set_new_segment_template(1968, "$RepresentationID$/video/1/init.mp4",
//!                                "$RepresentationID$/video/1/seg-$Number$.m4f", 0, 1000);
//! video.add_new_representation_video(1518664, "avc1.4d401f", "800", "30000/1001", 960, 540);
//! let xml = mpd.write_to_string().unwrap();
//! assert!(xml.contains("cenc:default_KID=\"08e36702-8f33-436c-a5dd-60ffe5571e60\""));
//! ```
//
// The MPD format is documented by ISO using an XML Schema at
// https://standards.iso.org/ittf/PubliclyAvailableStandards/MPEG-DASH_schema_files/DASH-MPD-edition2.xsd
//
// We are using the quick_xml + serde crates to deserialize the XML content to Rust structs, and the
// reverse serialization process of programmatically generating XML from Rust structs. Note that
// serde will ignore unknown fields when deserializing, so we don't need to cover every single
// possible field. Attribute fields are renamed with an "@" prefix, which quick-xml uses to
// distinguish attributes from child elements.


#![allow(non_snake_case)]

mod duration;
pub mod pssh;
pub mod content_protection;
mod builder;
#[cfg(feature = "scte35")]
pub mod scte35;

use std::fmt;
use std::path::Path;
use std::time::Duration;
use fs_err as fs;
use serde::{Serialize, Deserialize};
use serde::de;
use serde_with::skip_serializing_none;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;
#[cfg(feature = "warn_ignored_elements")]
use tracing::warn;
use crate::duration::{deserialize_xs_duration, serialize_xs_duration};

pub use crate::duration::{parse_xs_duration, format_xs_duration};
pub use crate::content_protection::{
    ContentProtection, ProtectionScheme, PlayReadyProtection, PlayReadyVersion, ExtraAttribute, ExtraElement};
pub use crate::pssh::{build_pssh_box, inspect_pssh_box, PsshBox};
pub use crate::builder::*;
#[cfg(feature = "scte35")]
pub use crate::scte35::{Signal, Binary, Scte35EventOption, SpliceInfoSection, SpliceCommand, SpliceInsert};


/// Type representing an xs:dateTime, as per <https://www.w3.org/TR/xmlschema-2/#dateTime>
// Something like 2021-06-03T13:00:00Z
pub type XsDatetime = DateTime<Utc>;


#[derive(thiserror::Error, Debug)]
pub enum DashMpdError {
    #[error("parse error {0}")]
    Parsing(String),
    #[error("serialization error {0}")]
    Serializing(String),
    #[error("invalid Duration: {0}")]
    InvalidDuration(String),
    #[error("invalid default KID: {0}")]
    InvalidKeyId(String),
    #[error("PlayReady Object is empty")]
    EmptyPlayReadyObject,
    #[error("BaseURL is empty")]
    EmptyBaseURL,
    #[error("system ID must be 16 bytes, was: {0}")]
    InvalidSystemId(usize),
    #[error("invalid PSSH box: {0}")]
    InvalidPssh(String),
    #[error("invalid Base64: {0}")]
    Base64(String),
    #[error("invalid SCTE-35 splice_info_section: {0}")]
    InvalidSplice(String),
    #[error("I/O error {1}")]
    Io(#[source] std::io::Error, String),
}


// Parse an xs:dateTime. The XML Schema allows the timezone to be omitted, and manifests in the wild
// (in particular for @availabilityStartTime) often do so; we interpret these as UTC.
fn parse_xs_datetime(s: &str) -> Result<XsDatetime, DashMpdError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            debug!("xs:dateTime {s} has no timezone, assuming UTC");
            return Ok(ndt.and_utc());
        }
    }
    Err(DashMpdError::Parsing(format!("invalid xs:dateTime {s:?}")))
}

fn deserialize_xs_datetime<'de, D>(deserializer: D) -> Result<Option<XsDatetime>, D::Error>
where
    D: de::Deserializer<'de>,
{
    match <Option<String>>::deserialize(deserializer)? {
        Some(s) => parse_xs_datetime(s.trim())
            .map(Some)
            .map_err(de::Error::custom),
        None => Ok(None),
    }
}


/// A generic descriptor, used for elements such as `Role`, `Accessibility`,
/// `AudioChannelConfiguration`, `EssentialProperty` and `UTCTiming`.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Descriptor {
    #[serde(rename = "@schemeIdUri")]
    pub schemeIdUri: Option<String>,
    #[serde(rename = "@value")]
    pub value: Option<String>,
    #[serde(rename = "@id")]
    pub id: Option<String>,
}

/// Descriptive information on the content.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProgramInformation {
    #[serde(rename = "@lang")]
    pub lang: Option<String>,
    #[serde(rename = "@moreInformationURL")]
    pub moreInformationURL: Option<String>,
    pub Title: Option<String>,
    pub Source: Option<String>,
    pub Copyright: Option<String>,
}

/// A URI string that specifies one or more common locations for Segments and other resources.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BaseURL {
    #[serde(rename = "@serviceLocation")]
    pub serviceLocation: Option<String>,
    #[serde(rename = "@byteRange")]
    pub byteRange: Option<String>,
    #[serde(rename = "$text")]
    pub base: String,
}

/// Describes a sequence of contiguous Segments with identical duration.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct S {
    /// time
    #[serde(rename = "@t")]
    pub t: Option<u64>,
    /// the duration
    #[serde(rename = "@d")]
    pub d: u64,
    /// the repeat count (number of contiguous Segments with identical MPD duration minus one),
    /// defaulting to zero if not present. A negative value repeats until the next S element.
    #[serde(rename = "@r")]
    pub r: Option<i64>,
}

/// Contains a sequence of `S` elements, each of which describes a sequence of contiguous segments of
/// identical duration.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentTimeline {
    #[serde(rename = "S")]
    pub segments: Vec<S>,
}

/// The first media segment in a sequence of Segments.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Initialization {
    #[serde(rename = "@sourceURL")]
    pub sourceURL: Option<String>,
    #[serde(rename = "@range")]
    pub range: Option<String>,
}

/// Allows template-based `SegmentURL` construction, with substitution of identifiers such as
/// `$RepresentationID$`, `$Number$` and `$Time$`.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentTemplate {
    #[serde(rename = "@duration")]
    pub duration: Option<u64>,
    #[serde(rename = "@initialization")]
    pub initialization: Option<String>,
    #[serde(rename = "@media")]
    pub media: Option<String>,
    #[serde(rename = "@index")]
    pub index: Option<String>,
    #[serde(rename = "@startNumber")]
    pub startNumber: Option<u64>,
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@presentationTimeOffset")]
    pub presentationTimeOffset: Option<u64>,
    pub SegmentTimeline: Option<SegmentTimeline>,
}

/// Specifies some common information concerning media segments, for single-segment
/// (on-demand profile) Representations.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentBase {
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@presentationTimeOffset")]
    pub presentationTimeOffset: Option<u64>,
    #[serde(rename = "@indexRange")]
    pub indexRange: Option<String>,
    #[serde(rename = "@indexRangeExact")]
    pub indexRangeExact: Option<bool>,
    pub Initialization: Option<Initialization>,
}

/// The URL of a media segment.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentURL {
    #[serde(rename = "@media")]
    pub media: Option<String>,
    #[serde(rename = "@mediaRange")]
    pub mediaRange: Option<String>,
    #[serde(rename = "@index")]
    pub index: Option<String>,
    #[serde(rename = "@indexRange")]
    pub indexRange: Option<String>,
}

/// Contains a sequence of SegmentURL elements.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SegmentList {
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "@duration")]
    pub duration: Option<u64>,
    pub Initialization: Option<Initialization>,
    #[serde(rename = "SegmentURL")]
    pub segment_urls: Vec<SegmentURL>,
}

/// A representation describes a version of the content, using a specific encoding and bitrate.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Representation {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@bandwidth")]
    pub bandwidth: Option<u64>,
    #[serde(rename = "@qualityRanking")]
    pub qualityRanking: Option<u64>,
    #[serde(rename = "@mimeType")]
    pub mimeType: Option<String>,
    /// An RFC6381 string, <https://tools.ietf.org/html/rfc6381>
    #[serde(rename = "@codecs")]
    pub codecs: Option<String>,
    #[serde(rename = "@audioSamplingRate")]
    pub audioSamplingRate: Option<u64>,
    #[serde(rename = "@width")]
    pub width: Option<u64>,
    #[serde(rename = "@height")]
    pub height: Option<u64>,
    #[serde(rename = "@frameRate")]
    pub frameRate: Option<String>, // can be something like "30000/1001"
    #[serde(rename = "@sar")]
    pub sar: Option<String>,
    #[serde(rename = "@scanType")]
    pub scanType: Option<String>,
    #[serde(rename = "@startWithSAP")]
    pub startWithSAP: Option<u64>,
    pub AudioChannelConfiguration: Vec<Descriptor>,
    pub ContentProtection: Vec<ContentProtection>,
    pub EssentialProperty: Vec<Descriptor>,
    pub SupplementalProperty: Vec<Descriptor>,
    pub BaseURL: Vec<BaseURL>,
    pub SegmentBase: Option<SegmentBase>,
    pub SegmentList: Option<SegmentList>,
    pub SegmentTemplate: Option<SegmentTemplate>,
}

/// Contains a set of interchangeable Representations, for example the different bitrates of one
/// video stream, or one language of the audio content.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AdaptationSet {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@group")]
    pub group: Option<u64>,
    // eg "audio", "video", "text"
    #[serde(rename = "@contentType")]
    pub contentType: Option<String>,
    /// Content language, in RFC 5646 format
    #[serde(rename = "@lang")]
    pub lang: Option<String>,
    #[serde(rename = "@par")]
    pub par: Option<String>,
    // eg "video/mp4"
    #[serde(rename = "@mimeType")]
    pub mimeType: Option<String>,
    #[serde(rename = "@codecs")]
    pub codecs: Option<String>,
    #[serde(rename = "@scanType")]
    pub scanType: Option<String>,
    #[serde(rename = "@audioSamplingRate")]
    pub audioSamplingRate: Option<u64>,
    #[serde(rename = "@width")]
    pub width: Option<u64>,
    #[serde(rename = "@height")]
    pub height: Option<u64>,
    #[serde(rename = "@frameRate")]
    pub frameRate: Option<String>,
    #[serde(rename = "@minBandwidth")]
    pub minBandwidth: Option<u64>,
    #[serde(rename = "@maxBandwidth")]
    pub maxBandwidth: Option<u64>,
    #[serde(rename = "@segmentAlignment")]
    pub segmentAlignment: Option<bool>,
    #[serde(rename = "@subsegmentAlignment")]
    pub subsegmentAlignment: Option<bool>,
    #[serde(rename = "@subsegmentStartsWithSAP")]
    pub subsegmentStartsWithSAP: Option<u64>,
    #[serde(rename = "@bitstreamSwitching")]
    pub bitstreamSwitching: Option<bool>,
    #[serde(rename = "@startWithSAP")]
    pub startWithSAP: Option<u64>,
    pub AudioChannelConfiguration: Vec<Descriptor>,
    pub ContentProtection: Vec<ContentProtection>,
    pub EssentialProperty: Vec<Descriptor>,
    pub SupplementalProperty: Vec<Descriptor>,
    pub Accessibility: Vec<Descriptor>,
    pub Role: Vec<Descriptor>,
    pub BaseURL: Vec<BaseURL>,
    pub SegmentBase: Option<SegmentBase>,
    pub SegmentList: Option<SegmentList>,
    pub SegmentTemplate: Option<SegmentTemplate>,
    #[serde(rename = "Representation")]
    pub representations: Vec<Representation>,
}

/// A DASH event, signalled in an `EventStream`.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@presentationTime")]
    pub presentationTime: Option<u64>,
    #[serde(rename = "@duration")]
    pub duration: Option<u64>,
    #[serde(rename = "@messageData")]
    pub messageData: Option<String>,
    #[cfg(feature = "scte35")]
    #[serde(rename = "Signal", alias = "scte35:Signal")]
    pub signal: Vec<Signal>,
}

/// A sequence of timed events attached to a Period.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EventStream {
    #[serde(rename = "@schemeIdUri")]
    pub schemeIdUri: Option<String>,
    #[serde(rename = "@value")]
    pub value: Option<String>,
    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,
    #[serde(rename = "Event")]
    pub events: Vec<Event>,
}

/// Describes a chunk of the content with a start time and a duration. Content can be split up into
/// multiple periods (such as chapters, advertising segments).
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Period {
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@start")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub start: Option<Duration>,
    #[serde(rename = "@duration")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub duration: Option<Duration>,
    #[serde(rename = "@bitstreamSwitching")]
    pub bitstreamSwitching: Option<bool>,
    pub BaseURL: Vec<BaseURL>,
    pub SegmentBase: Option<SegmentBase>,
    pub SegmentList: Option<SegmentList>,
    pub SegmentTemplate: Option<SegmentTemplate>,
    pub AssetIdentifier: Option<Descriptor>,
    #[serde(rename = "EventStream")]
    pub event_streams: Vec<EventStream>,
    #[serde(rename = "AdaptationSet")]
    pub adaptations: Vec<AdaptationSet>,
    pub SupplementalProperty: Vec<Descriptor>,
}

/// The root node of a DASH MPD manifest.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MPD {
    #[serde(rename = "@xmlns")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:cenc")]
    pub xmlns_cenc: Option<String>,
    #[serde(rename = "@xmlns:mspr")]
    pub xmlns_mspr: Option<String>,
    #[serde(rename = "@xmlns:xlink")]
    pub xmlns_xlink: Option<String>,
    #[serde(rename = "@xmlns:xsi")]
    pub xmlns_xsi: Option<String>,
    #[serde(rename = "@xsi:schemaLocation", alias = "@schemaLocation")]
    pub schemaLocation: Option<String>,
    #[serde(rename = "@id")]
    pub id: Option<String>,
    #[serde(rename = "@profiles")]
    pub profiles: Option<String>,
    /// The Presentation Type, either "static" or "dynamic" (a live stream for which segments become
    /// available over time).
    #[serde(rename = "@type")]
    pub mpdtype: Option<String>,
    #[serde(rename = "@availabilityStartTime")]
    #[serde(deserialize_with = "deserialize_xs_datetime", default)]
    pub availabilityStartTime: Option<XsDatetime>,
    #[serde(rename = "@publishTime")]
    #[serde(deserialize_with = "deserialize_xs_datetime", default)]
    pub publishTime: Option<XsDatetime>,
    #[serde(rename = "@availabilityEndTime")]
    #[serde(deserialize_with = "deserialize_xs_datetime", default)]
    pub availabilityEndTime: Option<XsDatetime>,
    #[serde(rename = "@mediaPresentationDuration")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub mediaPresentationDuration: Option<Duration>,
    #[serde(rename = "@minimumUpdatePeriod")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub minimumUpdatePeriod: Option<Duration>,
    /// Prescribes how many seconds of buffer a client should keep to avoid stalling when streaming
    /// under ideal network conditions with bandwidth matching the @bandwidth attribute.
    #[serde(rename = "@minBufferTime")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub minBufferTime: Option<Duration>,
    #[serde(rename = "@timeShiftBufferDepth")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub timeShiftBufferDepth: Option<Duration>,
    /// A suggested delay of the presentation compared to the Live edge.
    #[serde(rename = "@suggestedPresentationDelay")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub suggestedPresentationDelay: Option<Duration>,
    #[serde(rename = "@maxSegmentDuration")]
    #[serde(deserialize_with = "deserialize_xs_duration", default)]
    #[serde(serialize_with = "serialize_xs_duration")]
    pub maxSegmentDuration: Option<Duration>,
    pub ProgramInformation: Option<ProgramInformation>,
    /// There may be several BaseURLs, for redundancy (for example multiple CDNs)
    #[serde(rename = "BaseURL")]
    pub base_url: Vec<BaseURL>,
    #[serde(rename = "Location")]
    pub locations: Vec<String>,
    #[serde(rename = "Period")]
    pub periods: Vec<Period>,
    pub EssentialProperty: Vec<Descriptor>,
    pub SupplementalProperty: Vec<Descriptor>,
    pub UTCTiming: Vec<Descriptor>,
}


/// Parse an MPD manifest, provided as an XML string, returning an `MPD` node.
///
/// With the `warn_ignored_elements` feature, a warning is logged for each XML element or attribute
/// in the manifest that is not represented in the `MPD` structs.
pub fn parse(xml: &str) -> Result<MPD, DashMpdError> {
    #[cfg(feature = "warn_ignored_elements")]
    {
        let xd = &mut quick_xml::de::Deserializer::from_str(xml);
        let _: MPD = serde_ignored::deserialize(xd, |path| {
            warn!("DASH manifest contains unknown XML element {}", path.to_string())
        }).map_err(|e| DashMpdError::Parsing(e.to_string()))?;
    }
    let xd = &mut quick_xml::de::Deserializer::from_str(xml);
    let mut mpd: MPD = serde_path_to_error::deserialize(xd)
        .map_err(|e| DashMpdError::Parsing(e.to_string()))?;
    let mut descriptors = Vec::new();
    for period in mpd.periods.iter_mut() {
        for adaptation in period.adaptations.iter_mut() {
            descriptors.extend(adaptation.ContentProtection.iter_mut());
            for rep in adaptation.representations.iter_mut() {
                descriptors.extend(rep.ContentProtection.iter_mut());
            }
        }
    }
    content_protection::restore_source_names(xml, descriptors)?;
    Ok(mpd)
}


const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

impl MPD {
    // Serialize to XML, with two-space indentation and no XML declaration.
    fn serialize_xml(&self) -> Result<String, DashMpdError> {
        let mut buffer = String::new();
        let mut ser = quick_xml::se::Serializer::with_root(&mut buffer, Some("MPD"))
            .map_err(|e| DashMpdError::Serializing(e.to_string()))?;
        ser.indent(' ', 2);
        self.serialize(ser)
            .map_err(|e| DashMpdError::Serializing(e.to_string()))?;
        Ok(buffer)
    }

    /// Parse an MPD manifest from an XML string.
    pub fn read_from_string(xml: &str) -> Result<MPD, DashMpdError> {
        parse(xml)
    }

    /// Parse an MPD manifest from a file.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<MPD, DashMpdError> {
        let path = path.as_ref();
        let xml = fs::read_to_string(path)
            .map_err(|e| DashMpdError::Io(e, String::from("reading MPD manifest")))?;
        parse(&xml)
    }

    /// Serialize this manifest to an XML document, including the XML declaration.
    pub fn write_to_string(&self) -> Result<String, DashMpdError> {
        let body = self.serialize_xml()?;
        Ok(format!("{XML_DECLARATION}\n{body}\n"))
    }

    /// Serialize this manifest to an XML document in file `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DashMpdError> {
        let path = path.as_ref();
        let xml = self.write_to_string()?;
        fs::write(path, xml)
            .map_err(|e| DashMpdError::Io(e, String::from("writing MPD manifest")))
    }
}

impl fmt::Display for MPD {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let xml = self.serialize_xml().map_err(|_| fmt::Error)?;
        write!(f, "{xml}")
    }
}


/// Returns `true` if this AdaptationSet contains audio content.
///
/// It contains audio if the `contentType` attribute` is `audio`, or the `mimeType` attribute is
/// `audio/*`, or if one of its child `Representation` nodes has an audio `mimeType` attribute.
pub fn is_audio_adaptation(a: &AdaptationSet) -> bool {
    if a.contentType.as_deref() == Some("audio") {
        return true;
    }
    if a.mimeType.as_deref().is_some_and(|m| m.starts_with("audio/")) {
        return true;
    }
    a.representations.iter()
        .any(|r| r.mimeType.as_deref().is_some_and(|m| m.starts_with("audio/")))
}

/// Returns `true` if this AdaptationSet contains video content.
///
/// It contains video if the `contentType` attribute` is `video`, or the `mimeType` attribute is
/// `video/*`, or if one of its child `Representation` nodes has a video `mimeType` attribute.
pub fn is_video_adaptation(a: &AdaptationSet) -> bool {
    if a.contentType.as_deref() == Some("video") {
        return true;
    }
    if a.mimeType.as_deref().is_some_and(|m| m.starts_with("video/")) {
        return true;
    }
    a.representations.iter()
        .any(|r| r.mimeType.as_deref().is_some_and(|m| m.starts_with("video/")))
}

fn is_subtitle_mimetype(m: &str) -> bool {
    m.starts_with("text/") ||
        m == MIME_TYPE_TTML || m == MIME_TYPE_SUBRIP || m == MIME_TYPE_DFXP ||
        m == "application/ttml+xml"
}

fn is_subtitle_codec(c: &str) -> bool {
    c == "wvtt" || c == "stpp" || c.starts_with("stpp.")
}

/// Returns `true` if this AdaptationSet contains subtitles or captions.
pub fn is_subtitle_adaptation(a: &AdaptationSet) -> bool {
    if a.contentType.as_deref() == Some("text") {
        return true;
    }
    if a.mimeType.as_deref().is_some_and(is_subtitle_mimetype) ||
        a.codecs.as_deref().is_some_and(is_subtitle_codec)
    {
        return true;
    }
    a.representations.iter().any(|r| {
        r.mimeType.as_deref().is_some_and(is_subtitle_mimetype) ||
            r.codecs.as_deref().is_some_and(is_subtitle_codec)
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xs_datetime() {
        let dt = parse_xs_datetime("2021-06-03T13:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-06-03T13:00:00+00:00");
        let dt = parse_xs_datetime("2021-06-03T15:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-06-03T13:00:00+00:00");
        let dt = parse_xs_datetime("2021-06-03T13:00:00.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
        assert!(parse_xs_datetime("2021-06-03T13:00").is_ok());
        assert!(parse_xs_datetime("yesterday").is_err());
    }

    #[test]
    fn test_adaptation_predicates() {
        let audio = AdaptationSet {
            mimeType: Some(String::from("audio/mp4")),
            ..Default::default()
        };
        assert!(is_audio_adaptation(&audio));
        assert!(!is_video_adaptation(&audio));
        let video = AdaptationSet {
            representations: vec!(Representation {
                mimeType: Some(String::from("video/mp4")),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(is_video_adaptation(&video));
        assert!(!is_subtitle_adaptation(&video));
        let subs = AdaptationSet {
            mimeType: Some(String::from("application/mp4")),
            codecs: Some(String::from("stpp.ttml.im1t")),
            ..Default::default()
        };
        assert!(is_subtitle_adaptation(&subs));
        let vtt = AdaptationSet { mimeType: Some(String::from("text/vtt")), ..Default::default() };
        assert!(is_subtitle_adaptation(&vtt));
        assert!(!is_audio_adaptation(&vtt));
    }
}
