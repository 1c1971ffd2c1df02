//! Well-known column names.
//!
//! Output column markers are matched case-insensitively.

/// Column holding the serialized aggregated-event document.
pub const DATA_COLUMN: &str = "flowData";

/// Output column resolved to the event's position within its record.
pub const COMPONENT_INDEX: &str = "componentIndex";

/// Output column resolved to the document's message flow id.
pub const MESSAGE_FLOW_ID: &str = "messageFlowId";

/// Optional record column used by stores for time-bounded queries.
pub const TIMESTAMP_COLUMN: &str = "_timestamp";

/// Partition count used when no hint service is available.
pub const DEFAULT_PARTITION_COUNT: usize = 6;
