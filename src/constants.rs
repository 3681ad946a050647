// Central constants for routing, registry sync and component payloads.

/// Separator between route segments (`shop.buy`) and in dispatch lookup keys.
pub const ROUTE_SEPARATOR: char = '.';
/// Separator between a component base id and its payload token.
pub const WIRE_SEPARATOR: char = ':';
/// Deepest route accepted: command.group.subcommand.
pub const MAX_ROUTE_DEPTH: usize = 3;
/// Platform ceiling for component custom ids.
pub const MAX_CUSTOM_ID_LEN: usize = 100;
/// Random bytes per payload token (8 bytes => 11 base64url chars).
pub const TOKEN_BYTES: usize = 8;
pub const DEFAULT_PAYLOAD_TTL_MINUTES: u32 = 120;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
/// How long the dispatcher waits for a handler to acknowledge before deferring on its behalf.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2_000;
/// Used for roots and groups that carry children but no description of their own.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description provided";

// User-facing notices
pub const NOTICE_UNAVAILABLE: &str = "This command is not available.";
pub const NOTICE_EXPIRED: &str =
    "This interaction is no longer available. Please run the command again.";
pub const NOTICE_FAILED: &str = "Something went wrong while handling this interaction.";
