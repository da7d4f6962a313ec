//! Hard size limits enforced per tenant.

pub const MAX_ROOMS_PER_TENANT: usize = 5_000;
pub const MAX_BOOKINGS_PER_TENANT: usize = 100_000;
pub const MAX_NAME_LEN: usize = 128;
pub const MAX_COURSE_NAME_LEN: usize = 256;
pub const MAX_TENANTS: usize = 1_000;
pub const MAX_TENANT_NAME_LEN: usize = 128;

/// The activity log keeps this many entries, newest first.
pub const LOG_CAPACITY: usize = 100;
