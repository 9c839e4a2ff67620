//! Script decoding.
//!
//! Accepted documents:
//! - a flat array of actions: `[{"at": 0, "pos": 50}, ...]`
//! - an object with `actions` and arbitrary metadata
//! - an object with `axes: [{"id": "R0", "actions": [...]}, ...]`, where a
//!   top-level `actions` array (if any) belongs to the primary axis
//!
//! Parsing runs twice over the text. The first pass only counts array
//! elements; the second deserializes straight into `Keyframe` vectors
//! allocated at exactly that size.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::axis::{AXIS_COUNT, AxisId};
use crate::tick::Tracks;
use crate::error::ScriptError;
use crate::keyframe::{Keyframe, KeyframeTrack, POS_MAX};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Keyframe tracks for up to four axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptSet {
    tracks: Tracks,
}

impl ScriptSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, axis: AxisId) -> Option<&Arc<KeyframeTrack>> {
        self.tracks[axis.index()].as_ref()
    }

    /// Install a track; empty tracks are ignored.
    pub fn insert(&mut self, axis: AxisId, track: KeyframeTrack) {
        if !track.is_empty() {
            self.tracks[axis.index()] = Some(Arc::new(track));
        }
    }

    /// Install an already shared track, replacing any previous one.
    pub fn put(&mut self, axis: AxisId, track: Arc<KeyframeTrack>) {
        if !track.is_empty() {
            self.tracks[axis.index()] = Some(track);
        }
    }

    pub fn take(&mut self, axis: AxisId) -> Option<Arc<KeyframeTrack>> {
        self.tracks[axis.index()].take()
    }

    /// Fill axes that have no track from `other`.
    pub fn merge_missing(&mut self, other: ScriptSet) {
        for (slot, theirs) in self.tracks.iter_mut().zip(other.tracks) {
            if slot.is_none() {
                *slot = theirs;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_some()).count()
    }

    /// Axes carrying a track, in declaration order.
    pub fn axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        AxisId::ALL
            .into_iter()
            .filter(|a| self.tracks[a.index()].is_some())
    }

    pub fn tracks(&self) -> &Tracks {
        &self.tracks
    }

    pub fn into_tracks(self) -> Tracks {
        self.tracks
    }
}

/// Read and parse a script file; a plain action list lands on `primary`.
pub fn load_script(path: &Path, primary: AxisId) -> Result<ScriptSet, ScriptError> {
    let bytes = std::fs::read(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_script(&bytes, primary).map_err(|e| e.in_file(path.to_path_buf()))
}

/// Parse script bytes. A plain action list, or the top-level `actions` of an
/// object, lands on `primary`.
pub fn parse_script(bytes: &[u8], primary: AxisId) -> Result<ScriptSet, ScriptError> {
    let text = decode_text(bytes);

    let mut de = serde_json::Deserializer::from_str(&text);
    let counts = CountDoc.deserialize(&mut de)?;
    de.end()?;

    let mut de = serde_json::Deserializer::from_str(&text);
    let doc = DocSeed { counts: &counts }.deserialize(&mut de)?;
    de.end()?;

    let Document {
        primary: primary_frames,
        axes,
        inverted,
    } = doc;

    let mut set = ScriptSet::new();
    let mut build = |axis: AxisId, mut frames: Vec<Keyframe>| {
        if frames.is_empty() || set.get(axis).is_some() {
            return;
        }
        if inverted {
            for k in &mut frames {
                k.pos = POS_MAX - k.pos;
            }
        }
        set.insert(axis, KeyframeTrack::from_keyframes(frames));
    };

    if let Some(frames) = primary_frames {
        build(primary, frames);
    }
    for (id, frames) in axes {
        match id.as_deref().and_then(AxisId::parse) {
            Some(axis) => build(axis, frames),
            None => tracing::warn!(id = id.as_deref().unwrap_or("<missing>"), "skipping unknown axis"),
        }
    }

    if set.is_empty() {
        return Err(ScriptError::Empty);
    }
    tracing::debug!(axes = set.len(), "script parsed");
    Ok(set)
}

/// Strip a UTF-8 BOM, decode UTF-16 when a UTF-16 BOM is present, and
/// replace invalid UTF-8 sequences otherwise.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => Cow::Owned(decode_utf16(rest, u16::from_le_bytes)),
        [0xFE, 0xFF, rest @ ..] => Cow::Owned(decode_utf16(rest, u16::from_be_bytes)),
        _ => String::from_utf8_lossy(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "lowercase")]
enum Key {
    Actions,
    Axes,
    Inverted,
    Id,
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct RawAction {
    at: f64,
    pos: f64,
}

impl From<RawAction> for Keyframe {
    fn from(a: RawAction) -> Self {
        // Saturating float-to-int; JSON cannot carry NaN.
        Keyframe::new(a.at.round() as i64, a.pos)
    }
}

// ---------------------------------------------------------------------------
// Counting pass
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Counts {
    primary: usize,
    axes: Vec<usize>,
}

struct CountSeq;

impl<'de> DeserializeSeed<'de> for CountSeq {
    type Value = usize;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<usize, D::Error> {
        d.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for CountSeq {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of actions")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<usize, A::Error> {
        let mut n = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            n += 1;
        }
        Ok(n)
    }
}

struct CountEntry;

impl<'de> DeserializeSeed<'de> for CountEntry {
    type Value = usize;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<usize, D::Error> {
        d.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for CountEntry {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an axis entry")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<usize, A::Error> {
        let mut n = 0;
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Actions => n = map.next_value_seed(CountSeq)?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(n)
    }
}

struct CountAxes;

impl<'de> DeserializeSeed<'de> for CountAxes {
    type Value = Vec<usize>;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Vec<usize>, D::Error> {
        d.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for CountAxes {
    type Value = Vec<usize>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of axis entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<usize>, A::Error> {
        let mut out = Vec::with_capacity(AXIS_COUNT);
        while let Some(n) = seq.next_element_seed(CountEntry)? {
            out.push(n);
        }
        Ok(out)
    }
}

struct CountDoc;

impl<'de> DeserializeSeed<'de> for CountDoc {
    type Value = Counts;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Counts, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for CountDoc {
    type Value = Counts;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a script array or object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Counts, A::Error> {
        Ok(Counts {
            primary: CountSeq.visit_seq(seq)?,
            axes: Vec::new(),
        })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Counts, A::Error> {
        let mut counts = Counts::default();
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Actions => counts.primary = map.next_value_seed(CountSeq)?,
                Key::Axes => counts.axes = map.next_value_seed(CountAxes)?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Fill pass
// ---------------------------------------------------------------------------

struct Document {
    primary: Option<Vec<Keyframe>>,
    axes: Vec<(Option<String>, Vec<Keyframe>)>,
    inverted: bool,
}

struct ActionsSeed {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for ActionsSeed {
    type Value = Vec<Keyframe>;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ActionsSeed {
    type Value = Vec<Keyframe>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of {at, pos} actions")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(self.capacity);
        while let Some(action) = seq.next_element::<RawAction>()? {
            out.push(Keyframe::from(action));
        }
        Ok(out)
    }
}

struct EntrySeed {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for EntrySeed {
    type Value = (Option<String>, Vec<Keyframe>);

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for EntrySeed {
    type Value = (Option<String>, Vec<Keyframe>);

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an axis entry with id and actions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut id = None;
        let mut frames = Vec::new();
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Id => id = Some(map.next_value::<String>()?),
                Key::Actions => {
                    frames = map.next_value_seed(ActionsSeed {
                        capacity: self.capacity,
                    })?;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok((id, frames))
    }
}

struct AxesSeed<'a> {
    capacities: &'a [usize],
}

impl<'de> DeserializeSeed<'de> for AxesSeed<'_> {
    type Value = Vec<(Option<String>, Vec<Keyframe>)>;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for AxesSeed<'_> {
    type Value = Vec<(Option<String>, Vec<Keyframe>)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of axis entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(self.capacities.len());
        loop {
            let capacity = self.capacities.get(out.len()).copied().unwrap_or(0);
            match seq.next_element_seed(EntrySeed { capacity })? {
                Some(entry) => out.push(entry),
                None => break,
            }
        }
        Ok(out)
    }
}

struct DocSeed<'a> {
    counts: &'a Counts,
}

impl<'de> DeserializeSeed<'de> for DocSeed<'_> {
    type Value = Document;

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<Document, D::Error> {
        d.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for DocSeed<'_> {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a script array or object")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Document, A::Error> {
        let frames = ActionsSeed {
            capacity: self.counts.primary,
        }
        .visit_seq(seq)?;
        Ok(Document {
            primary: Some(frames),
            axes: Vec::new(),
            inverted: false,
        })
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Document, A::Error> {
        let mut doc = Document {
            primary: None,
            axes: Vec::new(),
            inverted: false,
        };
        while let Some(key) = map.next_key::<Key>()? {
            match key {
                Key::Actions => {
                    doc.primary = Some(map.next_value_seed(ActionsSeed {
                        capacity: self.counts.primary,
                    })?);
                }
                Key::Axes => {
                    doc.axes = map.next_value_seed(AxesSeed {
                        capacities: &self.counts.axes,
                    })?;
                }
                Key::Inverted => {
                    doc.inverted = map.next_value::<Option<bool>>()?.unwrap_or(false);
                }
                Key::Id | Key::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(doc)
    }
}
