//! Support for signalling SCTE-35 splice points (ad breaks) in a DASH manifest
//
// Society of Cable Telecommunications Engineers (SCTE) standard 35 "Digital Program Insertion
// Cueing Message" concerns the messages that specify points in a content stream where alternate
// content (typically advertising or local programming) can be inserted.
//
//      https://en.wikipedia.org/wiki/SCTE-35
//
// In a DASH manifest, SCTE-35 messages are carried in Event elements within a Period-level
// EventStream whose @schemeIdUri is urn:scte:scte35:2014:xml+bin. Each Event contains a Signal
// element wrapping a Binary element, whose text content is the Base64 encoding of the binary
// splice_info_section:
//
//    <EventStream schemeIdUri="urn:scte:scte35:2014:xml+bin" timescale="90000">
//      <Event id="1" presentationTime="10000">
//        <Signal xmlns="urn:scte:scte35:2014:xml+bin">
//          <Binary xmlns="urn:scte:scte35:2014:xml+bin">/DAgAAAAAAAAAP/wBQb+AABb0AAAABAAAAEAAQCA==</Binary>
//        </Signal>
//      </Event>
//    </EventStream>
//
// Callers either supply the Base64 body, or describe a splice_info_section (SCTE 35 section 9.6)
// which we encode. The encoder handles the splice_null, splice_insert and time_signal commands in
// program splice mode, unencrypted, with opaque splice descriptors. We don't decode sections.

use std::io::Write;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use byteorder::{BigEndian, WriteBytesExt};
use serde::{Serialize, Deserialize};
use serde_with::skip_serializing_none;
use tracing::trace;
use crate::{Period, EventStream, Event, DashMpdError};


/// Scheme of a Period EventStream carrying SCTE-35 2014 XML+binary events.
pub const SCTE35_2014_SCHEME_ID_URI: &str = "urn:scte:scte35:2014:xml+bin";
/// The SCTE-35 2016 XML namespace.
pub const SCTE35_2016_NAMESPACE: &str = "http://www.scte.org/schemas/35/2016";


/// A binary representation of a SCTE-35 cue message, Base64-encoded.
#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Binary {
    #[serde(rename = "@xmlns")]
    pub xmlns: Option<String>,
    #[serde(rename = "@signalType")]
    pub signal_type: Option<String>,
    #[serde(rename = "$text")]
    pub content: String,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Signal {
    #[serde(rename = "@xmlns")]
    pub xmlns: Option<String>,
    #[serde(rename = "@namespace")]
    pub namespace: Option<String>,
    #[serde(rename = "Binary", alias = "scte35:Binary")]
    pub binaries: Vec<Binary>,
}

const SPLICE_INFO_TABLE_ID: u8 = 0xFC;
const MAX_SECTION_LENGTH: usize = 4093;
const MAX_33_BITS: u64 = 0x1_FFFF_FFFF;


/// Signals a break of `duration` ticks of the 90 kHz clock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BreakDuration {
    /// Return to the network feed automatically at the end of the break.
    pub auto_return: bool,
    pub duration: u64,
}

/// A splice_insert() command, announcing a splice point for the whole program.
///
/// The default value is a minimal command: event 0, not out of network, splice time not specified.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpliceInsert {
    pub splice_event_id: u32,
    /// Cancels a previously sent event; the remaining fields are not encoded.
    pub splice_event_cancel: bool,
    pub out_of_network: bool,
    /// Splice at the earliest opportunity; `splice_time` is then ignored.
    pub splice_immediate: bool,
    /// PTS of the splice point (90 kHz clock, 33 bits), or `None` for an unspecified time.
    pub splice_time: Option<u64>,
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceCommand {
    SpliceNull,
    SpliceInsert(SpliceInsert),
    /// time_signal(), with an optional PTS (90 kHz clock, 33 bits).
    TimeSignal(Option<u64>),
}

/// A splice_descriptor(). `data` follows the 32-bit identifier (usually "CUEI").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceDescriptor {
    pub tag: u8,
    pub identifier: u32,
    pub data: Vec<u8>,
}

/// A SCTE-35 splice_info_section, the binary cue message carried in a Signal Binary element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceInfoSection {
    pub pts_adjustment: u64,
    /// 12-bit authorization tier; 0xFFF when unused.
    pub tier: u16,
    pub command: SpliceCommand,
    pub descriptors: Vec<SpliceDescriptor>,
}

fn io_error(e: std::io::Error) -> DashMpdError {
    DashMpdError::Io(e, String::from("writing splice_info_section"))
}

fn check_33_bits(what: &str, value: u64) -> Result<u64, DashMpdError> {
    if value > MAX_33_BITS {
        return Err(DashMpdError::InvalidSplice(format!("{what} {value} does not fit in 33 bits")));
    }
    Ok(value)
}

// A 33-bit value whose most significant bit shares its first octet with the flag bits in `high`.
fn write_33_bits(buf: &mut Vec<u8>, high: u8, value: u64) -> Result<(), DashMpdError> {
    buf.write_u8(high | ((value >> 32) & 1) as u8).map_err(io_error)?;
    buf.write_u32::<BigEndian>((value & 0xFFFF_FFFF) as u32).map_err(io_error)
}

fn write_splice_time(buf: &mut Vec<u8>, pts: Option<u64>) -> Result<(), DashMpdError> {
    match pts {
        Some(t) => write_33_bits(buf, 0xFE, check_33_bits("splice time", t)?),
        None => buf.write_u8(0x7F).map_err(io_error),
    }
}

// CRC-32/MPEG-2: polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection, no final XOR.
fn crc32_mpeg2(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in data {
        crc ^= u32::from(b) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
        }
    }
    crc
}

impl SpliceInsert {
    fn write(&self, buf: &mut Vec<u8>) -> Result<(), DashMpdError> {
        buf.write_u32::<BigEndian>(self.splice_event_id).map_err(io_error)?;
        buf.write_u8(if self.splice_event_cancel { 0xFF } else { 0x7F }).map_err(io_error)?;
        if self.splice_event_cancel {
            return Ok(());
        }
        // program_splice_flag set, four reserved bits
        let mut flags = 0x4F;
        if self.out_of_network {
            flags |= 0x80;
        }
        if self.break_duration.is_some() {
            flags |= 0x20;
        }
        if self.splice_immediate {
            flags |= 0x10;
        }
        buf.write_u8(flags).map_err(io_error)?;
        if !self.splice_immediate {
            write_splice_time(buf, self.splice_time)?;
        }
        if let Some(bd) = &self.break_duration {
            let high = if bd.auto_return { 0xFE } else { 0x7E };
            write_33_bits(buf, high, check_33_bits("break duration", bd.duration)?)?;
        }
        buf.write_u16::<BigEndian>(self.unique_program_id).map_err(io_error)?;
        buf.write_u8(self.avail_num).map_err(io_error)?;
        buf.write_u8(self.avails_expected).map_err(io_error)
    }
}

impl SpliceCommand {
    pub fn command_type(&self) -> u8 {
        match self {
            SpliceCommand::SpliceNull => 0x00,
            SpliceCommand::SpliceInsert(_) => 0x05,
            SpliceCommand::TimeSignal(_) => 0x06,
        }
    }

    fn write(&self, buf: &mut Vec<u8>) -> Result<(), DashMpdError> {
        match self {
            SpliceCommand::SpliceNull => Ok(()),
            SpliceCommand::SpliceInsert(si) => si.write(buf),
            SpliceCommand::TimeSignal(pts) => write_splice_time(buf, *pts),
        }
    }
}

impl SpliceDescriptor {
    fn write(&self, buf: &mut Vec<u8>) -> Result<(), DashMpdError> {
        let length = u8::try_from(4 + self.data.len())
            .map_err(|_| DashMpdError::InvalidSplice(
                format!("splice descriptor with tag {} is too long", self.tag)))?;
        buf.write_u8(self.tag).map_err(io_error)?;
        buf.write_u8(length).map_err(io_error)?;
        buf.write_u32::<BigEndian>(self.identifier).map_err(io_error)?;
        buf.write_all(&self.data).map_err(io_error)
    }
}

impl SpliceInfoSection {
    /// A section carrying `command`, with no PTS adjustment, unused tier and no descriptors.
    pub fn new(command: SpliceCommand) -> SpliceInfoSection {
        SpliceInfoSection {
            pts_adjustment: 0,
            tier: 0xFFF,
            command,
            descriptors: Vec::new(),
        }
    }

    /// The binary splice_info_section, terminated by its CRC_32.
    pub fn encode(&self) -> Result<Vec<u8>, DashMpdError> {
        if self.tier > 0xFFF {
            return Err(DashMpdError::InvalidSplice(format!("tier {:#x} does not fit in 12 bits", self.tier)));
        }
        let pts_adjustment = check_33_bits("pts_adjustment", self.pts_adjustment)?;
        let mut command = Vec::new();
        self.command.write(&mut command)?;
        let mut descriptors = Vec::new();
        for d in &self.descriptors {
            d.write(&mut descriptors)?;
        }
        // from protocol_version to the end of the CRC_32
        let section_length = 17 + command.len() + descriptors.len();
        if section_length > MAX_SECTION_LENGTH {
            return Err(DashMpdError::InvalidSplice(format!("section length {section_length} is too large")));
        }
        let mut buf = Vec::with_capacity(3 + section_length);
        buf.write_u8(SPLICE_INFO_TABLE_ID).map_err(io_error)?;
        // section_syntax_indicator 0, private_indicator 0, sap_type 3 (not specified)
        buf.write_u16::<BigEndian>(0x3000 | section_length as u16).map_err(io_error)?;
        // protocol_version
        buf.write_u8(0).map_err(io_error)?;
        // encrypted_packet 0, encryption_algorithm 0
        write_33_bits(&mut buf, 0x00, pts_adjustment)?;
        // cw_index
        buf.write_u8(0xFF).map_err(io_error)?;
        buf.write_u24::<BigEndian>((u32::from(self.tier) << 12) | command.len() as u32).map_err(io_error)?;
        buf.write_u8(self.command.command_type()).map_err(io_error)?;
        buf.write_all(&command).map_err(io_error)?;
        buf.write_u16::<BigEndian>(descriptors.len() as u16).map_err(io_error)?;
        buf.write_all(&descriptors).map_err(io_error)?;
        let crc = crc32_mpeg2(&buf);
        buf.write_u32::<BigEndian>(crc).map_err(io_error)?;
        trace!("encoded splice_info_section of {} octets", buf.len());
        Ok(buf)
    }

    /// The encoded section in Base64, the form carried in a SCTE-35 Binary element.
    pub fn to_base64(&self) -> Result<String, DashMpdError> {
        self.encode().map(|b| BASE64_STANDARD.encode(b))
    }
}


/// Modifications applied to the Event created by `Period::add_new_scte35_break`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scte35EventOption {
    /// Carry this Base64-encoded splice_info_section in the event's Signal, replacing any
    /// existing body. The Signal and Binary elements are placed in the SCTE-35 2014 namespace.
    BodyBinary(String),
    /// Set the `namespace` attribute of the event's Signal.
    Namespace(String),
}

impl Scte35EventOption {
    /// Carry the encoded `section` in the event's Signal, as for `BodyBinary`.
    pub fn splice_info_section(section: &SpliceInfoSection) -> Result<Scte35EventOption, DashMpdError> {
        Ok(Scte35EventOption::BodyBinary(section.to_base64()?))
    }

    /// Carry a splice_info_section holding the splice_insert command `insert`.
    pub fn splice_insert(insert: SpliceInsert) -> Result<Scte35EventOption, DashMpdError> {
        Scte35EventOption::splice_info_section(&SpliceInfoSection::new(SpliceCommand::SpliceInsert(insert)))
    }

    fn apply(&self, event: &mut Event) {
        // Options act on the event's single Signal, which is created on first use.
        if event.signal.is_empty() {
            event.signal.push(Signal::default());
        }
        event.signal.truncate(1);
        let signal = &mut event.signal[0];
        match self {
            Scte35EventOption::BodyBinary(body) => {
                signal.xmlns = Some(String::from(SCTE35_2014_SCHEME_ID_URI));
                signal.binaries = vec!(Binary {
                    xmlns: Some(String::from(SCTE35_2014_SCHEME_ID_URI)),
                    signal_type: None,
                    content: body.clone(),
                });
            },
            Scte35EventOption::Namespace(ns) => {
                signal.namespace = Some(ns.clone());
            },
        }
    }
}

impl EventStream {
    pub fn is_scte35(&self) -> bool {
        self.schemeIdUri.as_deref() == Some(SCTE35_2014_SCHEME_ID_URI)
    }
}

impl Period {
    /// Add a SCTE-35 splice event with identifier `id` at `presentation_time` (in units of the
    /// EventStream timescale).
    ///
    /// The event is added to the Period's first EventStream with the SCTE-35 2014 scheme. If there
    /// is none, a new EventStream is created with `timescale`; the timescale of an existing stream
    /// is left unchanged. Events in the stream remain ordered by presentation time, and events
    /// with equal presentation times keep their insertion order.
    pub fn add_new_scte35_break(
        &mut self,
        timescale: u64,
        presentation_time: u64,
        id: &str,
        options: &[Scte35EventOption]) -> &mut Event
    {
        let mut event = Event {
            id: Some(String::from(id)),
            presentationTime: Some(presentation_time),
            ..Default::default()
        };
        for opt in options {
            opt.apply(&mut event);
        }
        let idx = match self.event_streams.iter().position(EventStream::is_scte35) {
            Some(i) => i,
            None => {
                self.event_streams.push(EventStream {
                    schemeIdUri: Some(String::from(SCTE35_2014_SCHEME_ID_URI)),
                    timescale: Some(timescale),
                    ..Default::default()
                });
                self.event_streams.len() - 1
            },
        };
        let stream = &mut self.event_streams[idx];
        stream.events.push(event);
        stream.events.sort_by_key(|e| e.presentationTime);
        trace!("SCTE-35 EventStream now has {} events", stream.events.len());
        // sorting is stable, so the new event is the last one with its presentation time
        let pos = stream.events.iter()
            .rposition(|e| e.presentationTime == Some(presentation_time))
            .unwrap_or(stream.events.len() - 1);
        &mut stream.events[pos]
    }
}
