use num_enum::{IntoPrimitive, TryFromPrimitive};

#[doc = r#"
The format word of the header chunk.

Only formats 0 and 1 describe tracks that play at the same time, so only
those two are loadable; format 2 stores independent patterns and is refused.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum FormatType {
    /// Format 0: one track carrying every channel
    SingleMultiChannel = 0,
    /// Format 1: several tracks played simultaneously
    Simultaneous = 1,
    /// Format 2: sequentially independent patterns
    SequentiallyIndependent = 2,
}

impl FormatType {
    /// True for formats whose tracks play in sync.
    pub const fn is_playable(&self) -> bool {
        matches!(self, Self::SingleMultiChannel | Self::Simultaneous)
    }
}
