//! Transport timing and threshold defaults.

/// Wait for a reply in `ID_REQUEST`, `LINK_CHECK` and `REGISTER`.
pub const STATE_TIMEOUT_MS: u32 = 2000;

/// Request attempts per state before giving up.
pub const STATE_RETRIES: u8 = 3;

/// Time spent inert in `FAILURE` before restarting from `INIT`.
pub const TIMEOUT_FAILURE_STATE: u32 = 10_000;

/// Window for collecting parent candidates after a discovery broadcast.
pub const PARENT_SEARCH_WINDOW_MS: u32 = 2000;

/// Consecutive failed transmissions after which the parent is abandoned.
pub const TRANSMISSION_FAILURES: u8 = 5;

/// Failure counters saturate here (4-bit counters).
pub const FAILURE_COUNTER_MAX: u8 = 15;

/// Fill byte for the receive scratch buffer after a rejected frame.
pub const RX_WIPE_BYTE: u8 = 0xFF;

pub const SIGNING_PRESENTATION_VERSION: u8 = 1;

/// Presentation flag: the sender only accepts signed messages.
pub const SIGNING_PRESENTATION_REQUIRE_SIGNATURES: u8 = 0x01;

/// Presentation flag: the sender verifies with whitelist salting.
pub const SIGNING_PRESENTATION_REQUIRE_WHITELISTING: u8 = 0x02;
