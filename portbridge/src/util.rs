pub(crate) mod cached_rw_lock;
