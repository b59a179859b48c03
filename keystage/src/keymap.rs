//! Keymap directory and the continuity resolver.
//!
//! Keymap positions change whenever a configuration adds, removes or reorders keymaps. The
//! abbreviation is what the user knows a keymap by, so after an apply the previously selected
//! keymap is looked up again by abbreviation.

use heapless::Vec;

use crate::parser::ParseError;

/// Max length of a keymap abbreviation
pub const KEYMAP_ABBREVIATION_LENGTH: usize = 3;

/// Short, stable identifier of a keymap.
///
/// Compared as `len` bytes, never as nul-terminated text.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeymapAbbreviation {
    bytes: [u8; KEYMAP_ABBREVIATION_LENGTH],
    len: u8,
}

impl KeymapAbbreviation {
    pub fn new(abbreviation: &[u8]) -> Result<Self, ParseError> {
        if abbreviation.is_empty() || abbreviation.len() > KEYMAP_ABBREVIATION_LENGTH {
            return Err(ParseError::InvalidLength);
        }
        let mut bytes = [0; KEYMAP_ABBREVIATION_LENGTH];
        bytes[..abbreviation.len()].copy_from_slice(abbreviation);
        Ok(Self {
            bytes,
            len: abbreviation.len() as u8,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }
}

impl PartialEq for KeymapAbbreviation {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for KeymapAbbreviation {}

/// A keymap as seen by the directory. Its index is its position in [`KeymapDirectory::keymaps`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeymapDescriptor {
    pub abbreviation: KeymapAbbreviation,
}

/// The keymaps of the live configuration and which one is selected.
pub trait KeymapDirectory {
    /// All keymaps of the live configuration, in configuration order
    fn keymaps(&self) -> &[KeymapDescriptor];

    fn current_keymap_index(&self) -> usize;

    fn default_keymap_index(&self) -> usize;

    fn switch_keymap(&mut self, index: usize);

    /// Abbreviation of the selected keymap, `None` if the selection points nowhere
    fn current_abbreviation(&self) -> Option<KeymapAbbreviation> {
        self.keymaps()
            .get(self.current_keymap_index())
            .map(|keymap| keymap.abbreviation)
    }
}

/// Outcome of [`restore_keymap`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeymapSelection {
    /// A keymap with the previous abbreviation exists and is selected
    Restored(usize),
    /// The previous keymap is gone, the default keymap is selected
    Fallback(usize),
}

impl KeymapSelection {
    pub fn index(&self) -> usize {
        match self {
            KeymapSelection::Restored(index) | KeymapSelection::Fallback(index) => *index,
        }
    }
}

/// Select the first keymap whose abbreviation equals `previous`, or the default keymap.
pub fn restore_keymap<C: KeymapDirectory>(ctx: &mut C, previous: Option<KeymapAbbreviation>) -> KeymapSelection {
    let found = previous.and_then(|previous| {
        ctx.keymaps()
            .iter()
            .position(|keymap| keymap.abbreviation == previous)
    });
    let selection = match found {
        Some(index) => KeymapSelection::Restored(index),
        None => KeymapSelection::Fallback(ctx.default_keymap_index()),
    };
    ctx.switch_keymap(selection.index());
    selection
}

/// A [`KeymapDirectory`] holding up to `N` keymaps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeymapList<const N: usize> {
    keymaps: Vec<KeymapDescriptor, N>,
    current: usize,
    default: usize,
}

impl<const N: usize> KeymapList<N> {
    pub const fn new() -> Self {
        Self {
            keymaps: Vec::new(),
            current: 0,
            default: 0,
        }
    }

    /// Drop all keymaps, the selection is kept until the next switch
    pub fn clear(&mut self) {
        self.keymaps.clear();
        self.default = 0;
    }

    /// Append a keymap, returns its index
    pub fn push(&mut self, abbreviation: KeymapAbbreviation) -> Result<usize, ParseError> {
        self.keymaps
            .push(KeymapDescriptor { abbreviation })
            .map_err(|_| ParseError::LimitExceeded)?;
        Ok(self.keymaps.len() - 1)
    }

    pub fn set_default(&mut self, index: usize) -> Result<(), ParseError> {
        if index >= self.keymaps.len() {
            return Err(ParseError::InvalidValue);
        }
        self.default = index;
        Ok(())
    }

    pub fn find(&self, abbreviation: &KeymapAbbreviation) -> Option<usize> {
        self.keymaps.iter().position(|k| &k.abbreviation == abbreviation)
    }

    pub fn len(&self) -> usize {
        self.keymaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keymaps.is_empty()
    }
}

impl<const N: usize> KeymapDirectory for KeymapList<N> {
    fn keymaps(&self) -> &[KeymapDescriptor] {
        &self.keymaps
    }

    fn current_keymap_index(&self) -> usize {
        self.current
    }

    fn default_keymap_index(&self) -> usize {
        self.default
    }

    fn switch_keymap(&mut self, index: usize) {
        if index >= self.keymaps.len() {
            warn!("Not a valid keymap {}, {} keymaps available", index, self.keymaps.len());
            return;
        }
        debug!("Switching to keymap {}", index);
        self.current = index;
    }
}
