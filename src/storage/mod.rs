//! Profile storage. The profile lives in memory while a process runs; between CLI invocations it
//! is kept in a single json file guarded by file locks.

pub mod profile_storage;
