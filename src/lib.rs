//! compcache - a transparent compiler cache front end.
//!
//! The library turns a raw C/C++/CUDA/Objective-C compiler command line into
//! the argument vectors and metadata later cache stages key on. The heavy
//! lifting happens in [`argproc::process_args`]; the other modules supply the
//! argument model ([`args`]), the option classification tables ([`compopt`]),
//! source language tables ([`language`]), per-invocation state ([`context`])
//! and a minimal content-addressed object store ([`cache`]).

pub mod argproc;
pub mod args;
pub mod cache;
pub mod common;
pub mod compopt;
pub mod context;
pub mod language;
pub mod util;
pub mod wrapper;
