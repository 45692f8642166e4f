//! Well-known parameter row names.
//!
//! The dispatcher reads and writes cells by (row, column); these constants
//! are the row-key vocabulary shared with the table that backs it.

// Addressing / header state
pub const POLLING_ADDRESS: &str = "polling_address";
pub const MANUFACTURER_ID: &str = "manufacturer_id";
pub const DEVICE_TYPE: &str = "device_type";
pub const DEVICE_ID: &str = "device_id";
pub const FRAME_TYPE: &str = "frame_type";
pub const ADDRESS_TYPE: &str = "address_type";
pub const MASTER_ADDRESS: &str = "master_address";
pub const BURST_MODE: &str = "burst_mode";

// Status bytes
pub const RESPONSE_CODE: &str = "response_code";
pub const DEVICE_STATUS: &str = "device_status";
pub const COMM_STATUS: &str = "comm_status";
pub const ERROR_STATUS: &str = "error_status";
pub const CONFIG_CHANGED: &str = "config_changed";

// Identity
pub const IDENTITY_MARKER: &str = "identity_marker";
pub const MIN_PREAMBLES: &str = "min_preambles";
pub const UNIVERSAL_REV: &str = "universal_rev";
pub const DEVICE_REV: &str = "device_rev";
pub const SOFTWARE_REV: &str = "software_rev";
pub const HARDWARE_REV: &str = "hardware_rev";
pub const DEVICE_FLAGS: &str = "device_flags";

// Dynamic variables
pub const PV: &str = "pv";
pub const PV_UNIT: &str = "pv_unit";
pub const SV: &str = "sv";
pub const SV_UNIT: &str = "sv_unit";
pub const TV: &str = "tv";
pub const TV_UNIT: &str = "tv_unit";
pub const QV: &str = "qv";
pub const QV_UNIT: &str = "qv_unit";
pub const LOOP_CURRENT: &str = "loop_current";
pub const PERCENT_RANGE: &str = "percent_range";

// Configuration
pub const LOOP_CURRENT_MODE: &str = "loop_current_mode";
pub const TAG: &str = "tag";
pub const DESCRIPTOR: &str = "descriptor";
pub const DATE: &str = "date";
pub const MESSAGE: &str = "message";
pub const FINAL_ASSEMBLY: &str = "final_assembly";
pub const TRANSDUCER_SERIAL: &str = "transducer_serial";
pub const TRANSDUCER_UNIT: &str = "transducer_unit";
pub const UPPER_LIMIT: &str = "upper_limit";
pub const LOWER_LIMIT: &str = "lower_limit";
pub const MIN_SPAN: &str = "min_span";
pub const ALARM_CODE: &str = "alarm_code";
pub const TRANSFER_FUNCTION: &str = "transfer_function";
pub const UPPER_RANGE: &str = "upper_range";
pub const LOWER_RANGE: &str = "lower_range";
pub const DAMPING: &str = "damping";
pub const WRITE_PROTECT: &str = "write_protect";
pub const PRIVATE_LABEL: &str = "private_label";
pub const PV_ASSIGNMENT: &str = "pv_assignment";
pub const SV_ASSIGNMENT: &str = "sv_assignment";
pub const TV_ASSIGNMENT: &str = "tv_assignment";
pub const QV_ASSIGNMENT: &str = "qv_assignment";
