//! Decoding and encoding of DASH `ContentProtection` descriptors.
//
// A ContentProtection element signals one DRM or encryption scheme, identified by its @schemeIdUri.
// The root descriptor (urn:mpeg:dash:mp4protection:2011) announces Common Encryption and carries
// the default key ID; per-DRM descriptors (urn:uuid:<system id>) carry system specific data, such
// as a Base64 PSSH box in a cenc:pssh child, or a PlayReady Object in an mspr:pro child.
//
// The in-memory form is a ContentProtection struct holding the attributes common to all
// descriptors and a ProtectionScheme tag with the scheme specific fields. The tag is selected from
// the @schemeIdUri alone (compared case-insensitively); unknown schemes decode to
// ProtectionScheme::Generic, which keeps every attribute in document order so that the element can
// be written back out.
//
// Namespace prefixes: the quick-xml deserializer hands us attribute and element names with their
// prefix stripped, except for namespace declarations (xmlns:cenc). Once serde has built the
// descriptors, a second pass over the source text with a quick-xml Reader recovers the qualified
// attribute names of each ContentProtection start tag, and the text-only child elements of
// descriptors for unknown schemes. `decode` and `crate::parse` both run this pass.
//
// Serialization goes through a transient WireShape value listing qualified attribute and child
// names, built per variant and dropped once written.

use std::borrow::Cow;
use std::fmt;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use quick_xml::Reader;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, trace, warn};
use crate::DashMpdError;
use crate::pssh::{build_pssh_box_base64, WIDEVINE_SYSTEM_ID, PLAYREADY_SYSTEM_ID, PLAYREADY_V10_SYSTEM_ID};


/// Scheme of the root ContentProtection descriptor, signalling Common Encryption.
pub const CONTENT_PROTECTION_ROOT_SCHEME_ID_URI: &str = "urn:mpeg:dash:mp4protection:2011";
/// The @value of the root descriptor for AES-CTR Common Encryption.
pub const CONTENT_PROTECTION_ROOT_VALUE: &str = "cenc";
/// XML namespace of the `cenc:` prefix.
pub const CENC_XMLNS: &str = "urn:mpeg:cenc:2013";
pub const WIDEVINE_SCHEME_ID_URI: &str = "urn:uuid:edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";
pub const PLAYREADY_SCHEME_ID_URI: &str = "urn:uuid:9a04f079-9840-4286-ab92-e65be0885f95";
pub const PLAYREADY_V10_SCHEME_ID_URI: &str = "urn:uuid:79f0049a-4098-8642-ab92-e65be0885f95";
/// XML namespace of the `mspr:` prefix.
pub const PLAYREADY_XMLNS: &str = "urn:microsoft:playready";


/// The two identifiers under which PlayReady is signalled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlayReadyVersion {
    #[default]
    Current,
    /// The system ID used by PlayReady 1.0 clients.
    V10,
}

impl PlayReadyVersion {
    pub fn scheme_id_uri(&self) -> &'static str {
        match self {
            PlayReadyVersion::Current => PLAYREADY_SCHEME_ID_URI,
            PlayReadyVersion::V10 => PLAYREADY_V10_SCHEME_ID_URI,
        }
    }

    pub fn system_id(&self) -> [u8; 16] {
        match self {
            PlayReadyVersion::Current => PLAYREADY_SYSTEM_ID,
            PlayReadyVersion::V10 => PLAYREADY_V10_SYSTEM_ID,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownScheme {
    Cenc,
    Widevine,
    PlayReady(PlayReadyVersion),
}

const KNOWN_SCHEMES: [(&str, KnownScheme); 4] = [
    (CONTENT_PROTECTION_ROOT_SCHEME_ID_URI, KnownScheme::Cenc),
    (WIDEVINE_SCHEME_ID_URI, KnownScheme::Widevine),
    (PLAYREADY_SCHEME_ID_URI, KnownScheme::PlayReady(PlayReadyVersion::Current)),
    (PLAYREADY_V10_SCHEME_ID_URI, KnownScheme::PlayReady(PlayReadyVersion::V10)),
];

fn known_scheme(scheme_id_uri: &str) -> Option<KnownScheme> {
    let lc = scheme_id_uri.trim().to_lowercase();
    KNOWN_SCHEMES.iter()
        .find(|(uri, _)| *uri == lc)
        .map(|(_, tag)| *tag)
}


/// An attribute of a ContentProtection element that is not modelled by a dedicated field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraAttribute {
    /// Namespace prefix, such as `cenc` or `xmlns`.
    pub prefix: Option<String>,
    pub name: String,
    pub value: String,
}

impl ExtraAttribute {
    pub fn new(prefix: Option<&str>, name: &str, value: &str) -> ExtraAttribute {
        ExtraAttribute {
            prefix: prefix.map(String::from),
            name: String::from(name),
            value: String::from(value),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.name),
            None => self.name.clone(),
        }
    }

    fn is_namespace_binding(&self, prefix: &str) -> bool {
        self.prefix.as_deref() == Some("xmlns") && self.name == prefix
    }
}

/// A child element of a ContentProtection descriptor for an unknown scheme, holding text and
/// attributes but no elements, such as the `dashif:Laurl` licence server URL of a ClearKey
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraElement {
    pub prefix: Option<String>,
    pub name: String,
    pub attributes: Vec<ExtraAttribute>,
    pub text: String,
}

impl ExtraElement {
    pub fn new(prefix: Option<&str>, name: &str, text: &str) -> ExtraElement {
        ExtraElement {
            prefix: prefix.map(String::from),
            name: String::from(name),
            attributes: Vec::new(),
            text: String::from(text),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Scheme specific content of a PlayReady descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlayReadyProtection {
    pub version: PlayReadyVersion,
    /// PlayReady Object, Base64 encoded (`mspr:pro`).
    pub pro: Option<String>,
    /// PSSH box, Base64 encoded (`cenc:pssh`).
    pub pssh: Option<String>,
    pub kid: Option<String>,
    pub isEncrypted: Option<u32>,
    pub IV_Size: Option<u32>,
}

/// The scheme specific part of a ContentProtection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionScheme {
    /// A scheme we have no specific knowledge of. The optional `cenc:pssh` child is kept since any
    /// CENC-style DRM system (ClearKey for example) may carry one; other text-only children are
    /// kept in document order in `elements`.
    Generic { pssh: Option<String>, elements: Vec<ExtraElement> },
    /// The root Common Encryption descriptor.
    Cenc { default_KID: Option<String> },
    PlayReady(PlayReadyProtection),
    Widevine { pssh: Option<String> },
}

/// Contains information on a DRM (rights management / encryption) mechanism used for the content.
/// If no ContentProtection node is present, no content protection is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentProtection {
    pub schemeIdUri: String,
    pub value: Option<String>,
    pub id: Option<String>,
    /// All other attributes, in document order.
    pub extra_attributes: Vec<ExtraAttribute>,
    pub scheme: ProtectionScheme,
}


/// Reformat a key ID given as 32 hex digits (dashes optional) into the lowercase 8-4-4-4-12 form.
pub fn format_kid(kid: &str) -> Option<String> {
    let hex: String = kid.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = hex.to_lowercase();
    Some(format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32]))
}

impl ContentProtection {
    /// A descriptor for an arbitrary scheme, with no scheme specific content.
    pub fn new(scheme_id_uri: &str) -> ContentProtection {
        ContentProtection {
            schemeIdUri: String::from(scheme_id_uri),
            value: None,
            id: None,
            extra_attributes: Vec::new(),
            scheme: ProtectionScheme::Generic { pssh: None, elements: Vec::new() },
        }
    }

    /// The root Common Encryption descriptor for the key ID `default_kid_hex`, which must be 32
    /// hex digits without dashes.
    pub fn cenc_root(default_kid_hex: &str) -> Result<ContentProtection, DashMpdError> {
        if default_kid_hex.len() != 32 {
            return Err(DashMpdError::InvalidKeyId(
                format!("{default_kid_hex:?}: default KID should be 32 characters")));
        }
        let kid = format_kid(default_kid_hex)
            .ok_or_else(|| DashMpdError::InvalidKeyId(
                format!("{default_kid_hex:?}: default KID should be hexadecimal")))?;
        Ok(ContentProtection {
            schemeIdUri: String::from(CONTENT_PROTECTION_ROOT_SCHEME_ID_URI),
            value: Some(String::from(CONTENT_PROTECTION_ROOT_VALUE)),
            id: None,
            extra_attributes: Vec::new(),
            scheme: ProtectionScheme::Cenc { default_KID: Some(kid) },
        })
    }

    /// A Widevine descriptor. When a non-empty Widevine header is supplied, it is wrapped in a PSSH
    /// box and carried in a `cenc:pssh` child.
    pub fn widevine(header: Option<&[u8]>) -> Result<ContentProtection, DashMpdError> {
        let pssh = match header {
            Some(h) if !h.is_empty() => Some(build_pssh_box_base64(&WIDEVINE_SYSTEM_ID, h)?),
            _ => None,
        };
        Ok(ContentProtection {
            schemeIdUri: String::from(WIDEVINE_SCHEME_ID_URI),
            value: None,
            id: None,
            extra_attributes: Vec::new(),
            scheme: ProtectionScheme::Widevine { pssh },
        })
    }

    /// A PlayReady descriptor carrying the Base64-encoded PlayReady Object `pro`. With `with_pssh`,
    /// the decoded PRO is also wrapped in a PSSH box carried in a `cenc:pssh` child.
    pub fn playready(pro: &str, version: PlayReadyVersion, with_pssh: bool) -> Result<ContentProtection, DashMpdError> {
        if pro.is_empty() {
            return Err(DashMpdError::EmptyPlayReadyObject);
        }
        let pssh = if with_pssh {
            let pro_bytes = BASE64_STANDARD.decode(pro)
                .map_err(|e| DashMpdError::Base64(format!("decoding PlayReady Object: {e}")))?;
            Some(build_pssh_box_base64(&version.system_id(), &pro_bytes)?)
        } else {
            None
        };
        Ok(ContentProtection {
            schemeIdUri: String::from(version.scheme_id_uri()),
            value: None,
            id: None,
            extra_attributes: Vec::new(),
            scheme: ProtectionScheme::PlayReady(PlayReadyProtection {
                version,
                pro: Some(String::from(pro)),
                pssh,
                ..Default::default()
            }),
        })
    }

    /// The default key ID of a root CENC descriptor.
    pub fn default_kid(&self) -> Option<&str> {
        match &self.scheme {
            ProtectionScheme::Cenc { default_KID } => default_KID.as_deref(),
            _ => None,
        }
    }

    /// The Base64-encoded PSSH box carried by this descriptor, if any.
    pub fn pssh(&self) -> Option<&str> {
        match &self.scheme {
            ProtectionScheme::Generic { pssh, .. } | ProtectionScheme::Widevine { pssh } => pssh.as_deref(),
            ProtectionScheme::PlayReady(pr) => pr.pssh.as_deref(),
            ProtectionScheme::Cenc { .. } => None,
        }
    }

    /// The 16-byte system ID of the DRM system this descriptor is for, if it is one we know.
    pub fn system_id(&self) -> Option<[u8; 16]> {
        match &self.scheme {
            ProtectionScheme::Widevine { .. } => Some(WIDEVINE_SYSTEM_ID),
            ProtectionScheme::PlayReady(pr) => Some(pr.version.system_id()),
            _ => None,
        }
    }

    /// Parse a single `<ContentProtection>` element.
    pub fn decode(xml: &str) -> Result<ContentProtection, DashMpdError> {
        let mut cp: ContentProtection = quick_xml::de::from_str(xml)
            .map_err(|e| DashMpdError::Parsing(e.to_string()))?;
        restore_source_names(xml, vec!(&mut cp))?;
        Ok(cp)
    }

    /// Serialize this descriptor as a standalone `<ContentProtection>` element.
    pub fn encode(&self) -> Result<String, DashMpdError> {
        quick_xml::se::to_string_with_root("ContentProtection", self)
            .map_err(|e| DashMpdError::Serializing(e.to_string()))
    }

    fn wire_shape(&self) -> WireShape<'_> {
        let mut attributes: Vec<(Cow<'_, str>, &str)> = Vec::new();
        let mut children: Vec<(Cow<'_, str>, Cow<'_, str>)> = Vec::new();
        attributes.push((Cow::Borrowed("@schemeIdUri"), self.schemeIdUri.as_str()));
        match (&self.scheme, &self.value) {
            (_, Some(v)) => attributes.push((Cow::Borrowed("@value"), v.as_str())),
            (ProtectionScheme::Cenc { .. }, None) =>
                attributes.push((Cow::Borrowed("@value"), CONTENT_PROTECTION_ROOT_VALUE)),
            _ => (),
        }
        if let Some(id) = &self.id {
            attributes.push((Cow::Borrowed("@id"), id.as_str()));
        }
        let declares = |prefix: &str| self.extra_attributes.iter().any(|a| a.is_namespace_binding(prefix));
        let uses_cenc = match &self.scheme {
            ProtectionScheme::Cenc { .. } => true,
            _ => self.pssh().is_some(),
        } || self.extra_attributes.iter().any(|a| a.prefix.as_deref() == Some("cenc"))
          || self.extra_elements().iter().any(|e| e.prefix.as_deref() == Some("cenc"));
        if uses_cenc && !declares("cenc") {
            attributes.push((Cow::Borrowed("@xmlns:cenc"), CENC_XMLNS));
        }
        if matches!(self.scheme, ProtectionScheme::PlayReady(_)) && !declares("mspr") {
            attributes.push((Cow::Borrowed("@xmlns:mspr"), PLAYREADY_XMLNS));
        }
        if let ProtectionScheme::Cenc { default_KID: Some(kid) } = &self.scheme {
            attributes.push((Cow::Borrowed("@cenc:default_KID"), kid.as_str()));
        }
        for a in &self.extra_attributes {
            attributes.push((Cow::Owned(format!("@{}", a.qualified_name())), a.value.as_str()));
        }
        if let Some(pssh) = self.pssh() {
            children.push((Cow::Borrowed("cenc:pssh"), Cow::Borrowed(pssh)));
        }
        if let ProtectionScheme::PlayReady(pr) = &self.scheme {
            if let Some(pro) = &pr.pro {
                children.push((Cow::Borrowed("mspr:pro"), Cow::Borrowed(pro)));
            }
            if let Some(kid) = &pr.kid {
                children.push((Cow::Borrowed("mspr:kid"), Cow::Borrowed(kid)));
            }
            if let Some(e) = pr.isEncrypted {
                children.push((Cow::Borrowed("mspr:isEncrypted"), Cow::Owned(e.to_string())));
            }
            if let Some(sz) = pr.IV_Size {
                children.push((Cow::Borrowed("mspr:IV_Size"), Cow::Owned(sz.to_string())));
            }
        }
        WireShape { attributes, children, elements: self.extra_elements() }
    }

    fn extra_elements(&self) -> &[ExtraElement] {
        match &self.scheme {
            ProtectionScheme::Generic { elements, .. } => elements,
            _ => &[],
        }
    }

    // Put back what the serde decoder could not see in the source element: the namespace prefixes
    // of attributes, and the text-only children of a descriptor for an unknown scheme.
    fn restore_from_source(&mut self, source: SourceElement) {
        let mut remaining = source.attributes.iter();
        for a in self.extra_attributes.iter_mut() {
            if let Some(s) = remaining.find(|s| s.name == a.name && s.value == a.value) {
                a.prefix.clone_from(&s.prefix);
            }
        }
        if let ProtectionScheme::Generic { elements, .. } = &mut self.scheme {
            *elements = source.children.into_iter()
                .filter(|c| c.name != "pssh")
                .collect();
        }
    }
}


// The XML shape of one ContentProtection element: qualified attribute names (with the "@" marker
// quick-xml uses for attributes) and text-only child elements, in output order.
struct WireShape<'a> {
    attributes: Vec<(Cow<'a, str>, &'a str)>,
    children: Vec<(Cow<'a, str>, Cow<'a, str>)>,
    elements: &'a [ExtraElement],
}

impl Serialize for WireShape<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = self.attributes.len() + self.children.len() + self.elements.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.attributes {
            map.serialize_entry(name.as_ref(), value)?;
        }
        for (name, text) in &self.children {
            map.serialize_entry(name.as_ref(), text.as_ref())?;
        }
        for e in self.elements {
            map.serialize_entry(&e.qualified_name(), e)?;
        }
        map.end()
    }
}

// The content of the element: attributes, then the text.
impl Serialize for ExtraElement {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 1))?;
        for a in &self.attributes {
            map.serialize_entry(&format!("@{}", a.qualified_name()), &a.value)?;
        }
        map.serialize_entry("$text", &self.text)?;
        map.end()
    }
}

impl Serialize for ContentProtection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.wire_shape().serialize(serializer)
    }
}


fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

// Attributes that only exist in one namespace, whose prefix quick-xml strips.
fn restore_prefix<'a>(prefix: Option<&'a str>, local: &str) -> Option<&'a str> {
    match (prefix, local) {
        (None, "default_KID") => Some("cenc"),
        _ => prefix,
    }
}

// Text content of the child elements we know about, whatever the scheme.
#[derive(Default)]
struct ChildValues {
    pssh: Option<String>,
    pro: Option<String>,
    kid: Option<String>,
    is_encrypted: Option<String>,
    iv_size: Option<String>,
}

fn parse_u32_child(name: &str, text: Option<String>) -> Result<Option<u32>, String> {
    text.map(|t| t.parse::<u32>()
             .map_err(|_| format!("invalid integer {t:?} in ContentProtection/mspr:{name}")))
        .transpose()
}

struct ContentProtectionVisitor;

impl<'de> Visitor<'de> for ContentProtectionVisitor {
    type Value = ContentProtection;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a ContentProtection element")
    }

    fn visit_map<A>(self, mut map: A) -> Result<ContentProtection, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut scheme_id_uri: Option<String> = None;
        let mut value = None;
        let mut id = None;
        let mut attributes: Vec<ExtraAttribute> = Vec::new();
        let mut children = ChildValues::default();
        while let Some(key) = map.next_key::<String>()? {
            if let Some(attr) = key.strip_prefix('@') {
                let v: String = map.next_value()?;
                match split_qname(attr) {
                    (None, "schemeIdUri") => scheme_id_uri = Some(v),
                    (None, "value") => value = Some(v),
                    (None, "id") => id = Some(v),
                    (prefix, local) => attributes.push(ExtraAttribute {
                        prefix: restore_prefix(prefix, local).map(String::from),
                        name: String::from(local),
                        value: v,
                    }),
                }
                continue;
            }
            match split_qname(&key).1 {
                "pssh" => children.pssh = Some(map.next_value::<String>()?.trim().to_string()),
                "pro" => children.pro = Some(map.next_value::<String>()?.trim().to_string()),
                "kid" => children.kid = Some(map.next_value::<String>()?.trim().to_string()),
                "isEncrypted" | "IsEncrypted" =>
                    children.is_encrypted = Some(map.next_value::<String>()?.trim().to_string()),
                "IV_Size" => children.iv_size = Some(map.next_value::<String>()?.trim().to_string()),
                _ => {
                    debug!("ignoring {key} in ContentProtection");
                    map.next_value::<IgnoredAny>()?;
                },
            }
        }
        let schemeIdUri = scheme_id_uri.ok_or_else(|| de::Error::missing_field("@schemeIdUri"))?;
        let scheme = match known_scheme(&schemeIdUri) {
            Some(tag) => {
                // namespace declarations that the encoder emits itself
                attributes.retain(|a| {
                    !(a.is_namespace_binding("cenc") && a.value == CENC_XMLNS) &&
                        !(a.is_namespace_binding("mspr") && a.value == PLAYREADY_XMLNS)
                });
                decode_known_scheme(tag, &mut attributes, children)
                    .map_err(<A::Error as de::Error>::custom)?
            },
            None => {
                debug!("unrecognized ContentProtection scheme {schemeIdUri}, keeping generic descriptor");
                let uses_cenc = children.pssh.is_some() ||
                    attributes.iter().any(|a| a.prefix.as_deref() == Some("cenc"));
                if uses_cenc {
                    attributes.retain(|a| !(a.is_namespace_binding("cenc") && a.value == CENC_XMLNS));
                }
                // the other children are recovered from the source text by restore_source_names
                ProtectionScheme::Generic { pssh: children.pssh, elements: Vec::new() }
            },
        };
        Ok(ContentProtection { schemeIdUri, value, id, extra_attributes: attributes, scheme })
    }
}

fn decode_known_scheme(
    tag: KnownScheme,
    attributes: &mut Vec<ExtraAttribute>,
    children: ChildValues) -> Result<ProtectionScheme, String>
{
    Ok(match tag {
        KnownScheme::Cenc => {
            let mut default_KID = None;
            if let Some(pos) = attributes.iter().position(|a| a.name == "default_KID") {
                let raw = attributes.remove(pos).value;
                default_KID = match format_kid(&raw) {
                    Some(kid) => Some(kid),
                    None => {
                        warn!("malformed cenc:default_KID {raw:?} in ContentProtection");
                        Some(raw)
                    },
                };
            }
            if children.pssh.is_some() {
                debug!("dropping cenc:pssh in root Common Encryption descriptor");
            }
            ProtectionScheme::Cenc { default_KID }
        },
        KnownScheme::Widevine => ProtectionScheme::Widevine { pssh: children.pssh },
        KnownScheme::PlayReady(version) => ProtectionScheme::PlayReady(PlayReadyProtection {
            version,
            pro: children.pro,
            pssh: children.pssh,
            kid: children.kid,
            isEncrypted: parse_u32_child("isEncrypted", children.is_encrypted)?,
            IV_Size: parse_u32_child("IV_Size", children.iv_size)?,
        }),
    })
}

impl<'de> Deserialize<'de> for ContentProtection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ContentProtectionVisitor)
    }
}


// A ContentProtection element as written in the source document, with qualified names.
#[derive(Debug, Default)]
struct SourceElement {
    attributes: Vec<ExtraAttribute>,
    children: Vec<ExtraElement>,
}

impl SourceElement {
    fn from_start(e: &BytesStart) -> Result<SourceElement, quick_xml::Error> {
        Ok(SourceElement { attributes: qualified_attributes(e)?, children: Vec::new() })
    }

    fn unprefixed(&self, name: &str) -> Option<&str> {
        self.attributes.iter()
            .find(|a| a.prefix.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    // Whether `cp` could have been decoded from this element.
    fn describes(&self, cp: &ContentProtection) -> bool {
        self.unprefixed("schemeIdUri") == Some(cp.schemeIdUri.as_str()) &&
            self.unprefixed("value") == cp.value.as_deref() &&
            self.unprefixed("id") == cp.id.as_deref() &&
            cp.extra_attributes.iter()
                .all(|a| self.attributes.iter().any(|s| s.name == a.name && s.value == a.value))
    }
}

fn qualified_attributes(e: &BytesStart) -> Result<Vec<ExtraAttribute>, quick_xml::Error> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let qname = e.decoder().decode(attr.key.as_ref())?;
        let value = attr.decode_and_unescape_value(e.decoder())?;
        let (prefix, local) = split_qname(&qname);
        attributes.push(ExtraAttribute::new(prefix, local, &value));
    }
    Ok(attributes)
}

fn qualified_element(e: &BytesStart, text: &str) -> Result<ExtraElement, quick_xml::Error> {
    let qname = e.decoder().decode(e.name().as_ref())?.into_owned();
    let (prefix, local) = split_qname(&qname);
    let mut elem = ExtraElement::new(prefix, local, text);
    elem.attributes = qualified_attributes(e)?;
    Ok(elem)
}

fn is_content_protection(e: &BytesStart) -> bool {
    e.local_name().as_ref() == b"ContentProtection"
}

// The child element of a ContentProtection being read, with its text still escaped, and whether
// it has held nothing but text so far.
struct PendingChild {
    element: ExtraElement,
    text: String,
    text_only: bool,
}

// Every ContentProtection element of `xml`, in document order.
fn scan_source_elements(xml: &str) -> Result<Vec<SourceElement>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut found = Vec::new();
    let mut current: Option<SourceElement> = None;
    let mut child: Option<PendingChild> = None;
    // element nesting below the current ContentProtection
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if current.is_none() {
                    if is_content_protection(&e) {
                        current = Some(SourceElement::from_start(&e)?);
                        depth = 0;
                    }
                } else {
                    depth += 1;
                    if depth == 1 {
                        let element = qualified_element(&e, "")?;
                        child = Some(PendingChild { element, text: String::new(), text_only: true });
                    } else if let Some(c) = child.as_mut() {
                        c.text_only = false;
                    }
                }
            },
            Event::Empty(e) => match current.as_mut() {
                None => if is_content_protection(&e) {
                    found.push(SourceElement::from_start(&e)?);
                },
                Some(cp) => if depth == 0 {
                    cp.children.push(qualified_element(&e, "")?);
                } else if let Some(c) = child.as_mut() {
                    c.text_only = false;
                },
            },
            Event::Text(t) if depth == 1 => if let Some(c) = child.as_mut() {
                c.text.push_str(&t.decode()?);
            },
            Event::GeneralRef(r) if depth == 1 => if let Some(c) = child.as_mut() {
                c.text.push('&');
                c.text.push_str(&r.decode()?);
                c.text.push(';');
            },
            Event::CData(t) if depth == 1 => if let Some(c) = child.as_mut() {
                c.text.push_str(&escape(t.decode()?));
            },
            Event::End(_) if current.is_some() => match depth {
                0 => found.extend(current.take()),
                1 => {
                    depth = 0;
                    if let (Some(cp), Some(mut c)) = (current.as_mut(), child.take()) {
                        if c.text_only {
                            c.element.text = unescape(&c.text)?.trim().to_string();
                            cp.children.push(c.element);
                        } else {
                            debug!("ignoring structured element {} in ContentProtection",
                                   c.element.qualified_name());
                        }
                    }
                },
                _ => depth -= 1,
            },
            Event::Eof => break,
            _ => (),
        }
    }
    Ok(found)
}

// Match each of the `descriptors` decoded from `xml` with its source element, and restore what
// serde could not see in it.
pub(crate) fn restore_source_names(xml: &str, descriptors: Vec<&mut ContentProtection>) -> Result<(), DashMpdError> {
    if descriptors.is_empty() {
        return Ok(());
    }
    let mut sources = scan_source_elements(xml)
        .map_err(|e| DashMpdError::Parsing(e.to_string()))?;
    for cp in descriptors {
        match sources.iter().position(|s| s.describes(cp)) {
            Some(pos) => cp.restore_from_source(sources.remove(pos)),
            None => trace!("no source element found for ContentProtection {}", cp.schemeIdUri),
        }
    }
    Ok(())
}
