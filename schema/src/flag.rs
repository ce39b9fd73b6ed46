//! Field flags and the process-wide flag table.
//!
//! Four flags are built in. Further flags are registered by name at startup
//! and keep their id for the life of the process; registering the same name
//! twice returns the same flag.

use std::fmt;

use parking_lot::RwLock;

use crate::error::{SchemaError, SchemaResult};

/// Maximum number of distinct flags, built-ins included.
pub const MAX_FLAGS: usize = 64;

const BUILTIN_NAMES: [&str; 4] = ["NoCompress", "NonNegative", "FloatEndianSwap", "KnownSize"];

/// Names of registered (non built-in) flags, indexed by `id - BUILTIN_NAMES.len()`.
static REGISTERED: RwLock<Vec<&'static str>> = parking_lot::const_rwlock(Vec::new());

/// A named modifier that changes how a field is encoded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Flag(u8);

impl Flag {
    /// Store integers and floats fixed-width instead of as varints.
    pub const NO_COMPRESS: Self = Self(0);
    /// Skip zig-zag mapping for signed values.
    pub const NON_NEGATIVE: Self = Self(1);
    /// Byte-swap IEEE bits before varint encoding.
    pub const FLOAT_ENDIAN_SWAP: Self = Self(2);
    /// Array length is fixed by the schema and not sent.
    pub const KNOWN_SIZE: Self = Self(3);

    /// Registers `name`, returning its flag. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidFlagName`] for empty names or names that
    /// would break the canonical schema string, and
    /// [`SchemaError::FlagTableFull`] once [`MAX_FLAGS`] ids are in use.
    pub fn register(name: &str) -> SchemaResult<Self> {
        validate_name(name)?;
        if let Some(flag) = Self::lookup(name) {
            return Ok(flag);
        }

        let mut table = REGISTERED.write();
        // Another thread may have won the race between lookup and write().
        if let Some(pos) = table.iter().position(|n| *n == name) {
            return Ok(Self::from_index(BUILTIN_NAMES.len() + pos));
        }
        let index = BUILTIN_NAMES.len() + table.len();
        if index >= MAX_FLAGS {
            return Err(SchemaError::FlagTableFull { max: MAX_FLAGS });
        }
        table.push(Box::leak(name.to_owned().into_boxed_str()));
        Ok(Self::from_index(index))
    }

    /// Finds a built-in or registered flag by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        if let Some(pos) = BUILTIN_NAMES.iter().position(|n| *n == name) {
            return Some(Self::from_index(pos));
        }
        REGISTERED
            .read()
            .iter()
            .position(|n| *n == name)
            .map(|pos| Self::from_index(BUILTIN_NAMES.len() + pos))
    }

    /// Name the flag was registered under.
    #[must_use]
    pub fn name(self) -> &'static str {
        let index = usize::from(self.0);
        if let Some(name) = BUILTIN_NAMES.get(index) {
            return name;
        }
        REGISTERED
            .read()
            .get(index - BUILTIN_NAMES.len())
            .copied()
            .unwrap_or_default()
    }

    /// Stable numeric id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_builtin(self) -> bool {
        (self.0 as usize) < BUILTIN_NAMES.len()
    }

    const fn from_index(index: usize) -> Self {
        Self(index as u8)
    }

    const fn mask(self) -> u64 {
        1u64 << self.0
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flag({})", self.name())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn validate_name(name: &str) -> SchemaResult<()> {
    let bad = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '[' | ']' | ','));
    if bad {
        return Err(SchemaError::InvalidFlagName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// A set of flags attached to one field.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u64);

impl FlagSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a copy of `self` with `flag` added.
    #[must_use]
    pub const fn with(self, flag: Flag) -> Self {
        Self(self.0 | flag.mask())
    }

    pub fn insert(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    pub fn remove(&mut self, flag: Flag) {
        self.0 &= !flag.mask();
    }

    #[must_use]
    pub const fn contains(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Flags present in both sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags in id order.
    pub fn iter(self) -> impl Iterator<Item = Flag> {
        (0..MAX_FLAGS)
            .filter(move |i| self.0 & (1u64 << i) != 0)
            .map(Flag::from_index)
    }

    /// Flag names in lexical order, independent of registration order.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.iter().map(Flag::name).collect();
        names.sort_unstable();
        names
    }

    /// Builds a set from flag names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownFlag`] for a name that is neither built in
    /// nor registered.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> SchemaResult<Self> {
        names.iter().try_fold(Self::empty(), |set, name| {
            let name = name.as_ref();
            Flag::lookup(name)
                .map(|flag| set.with(flag))
                .ok_or_else(|| SchemaError::UnknownFlag {
                    name: name.to_owned(),
                })
        })
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Flag> for FlagSet {
    fn from(flag: Flag) -> Self {
        Self::empty().with(flag)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Flag::name)).finish()
    }
}
