mod access;
pub(crate) mod clock;
pub mod tso;

pub use tso::global_unique_id;

pub use clock::now;

pub use access::chance;
pub use access::random_int;
pub use access::random_time;
pub use access::rank;
pub use access::schedule;
pub use access::timeout;

pub(crate) use access::next_scheduled;
pub(crate) use access::pop_scheduled;
pub(crate) use access::schedule_at;
pub(crate) use access::schedule_now;
pub(crate) use access::set_process;
pub(crate) use access::setup_access;

pub(crate) use clock::fast_forward_clock;

pub(crate) fn drop_all() {
    clock::drop_clock();
    tso::drop_tso();
    access::drop_access();
}
