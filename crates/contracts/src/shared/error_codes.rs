//! Wire error codes carried in `error.code`.

pub const NOT_FOUND: &str = "NOT_FOUND";
pub const LEAD_NOT_FOUND: &str = "LEAD_NOT_FOUND";
pub const STAGE_NOT_FOUND: &str = "STAGE_NOT_FOUND";

pub const LEAD_CANNOT_CONVERT: &str = "LEAD_CANNOT_CONVERT";
pub const LEAD_ALREADY_CONVERTED: &str = "LEAD_ALREADY_CONVERTED";
pub const LEAD_ALREADY_HAS_ACCOUNT: &str = "LEAD_ALREADY_HAS_ACCOUNT";
pub const COMPANY_NAME_REQUIRED: &str = "COMPANY_NAME_REQUIRED";
pub const INVALID_STATUS: &str = "INVALID_STATUS";
pub const INVALID_STAGE: &str = "INVALID_STAGE";
pub const INVALID_OPERATION: &str = "INVALID_OPERATION";
pub const STAGE_IN_USE: &str = "STAGE_IN_USE";
pub const PARTIAL_REORDER: &str = "PARTIAL_REORDER";
pub const DUPLICATE_CODE: &str = "DUPLICATE_CODE";

pub const ACCOUNT_CREATION_FAILED: &str = "ACCOUNT_CREATION_FAILED";
pub const CONTACT_CREATION_FAILED: &str = "CONTACT_CREATION_FAILED";
pub const OPPORTUNITY_CREATION_FAILED: &str = "OPPORTUNITY_CREATION_FAILED";

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const SERIALIZATION_CONFLICT: &str = "SERIALIZATION_CONFLICT";
pub const DEADLINE_EXCEEDED: &str = "DEADLINE_EXCEEDED";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const FORBIDDEN: &str = "FORBIDDEN";
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

// Field-level codes used in `field_errors[].code`
pub const FIELD_REQUIRED: &str = "required";
pub const FIELD_OUT_OF_RANGE: &str = "out_of_range";
pub const FIELD_INVALID_FORMAT: &str = "invalid_format";
pub const FIELD_NOT_ALLOWED: &str = "not_allowed";
pub const FIELD_DUPLICATE: &str = "duplicate";
pub const DUPLICATE_WON_STAGE: &str = "DUPLICATE_WON_STAGE";
