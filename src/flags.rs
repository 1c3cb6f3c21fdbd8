//! Context-establishment flags (part of the data model, §3).

bitflags::bitflags! {
    /// Flags requested at `InitSecContext` time and narrowed down to what
    /// was actually negotiated in `SecurityContext::session_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ContextFlag: u32 {
        const DELEG          = 0x0001;
        const MUTUAL         = 0x0002;
        const REPLAY         = 0x0004;
        const SEQUENCE       = 0x0008;
        const CONF           = 0x0010;
        const INTEG          = 0x0020;
        const ANON           = 0x0040;
        const CHANNEL_BOUND  = 0x0800;
        const DCE_STYLE      = 0x1000;
        const IDENTIFY       = 0x2000;
        const EXTENDED_ERROR = 0x4000;
    }
}

impl std::fmt::Display for ContextFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.bits())
    }
}
