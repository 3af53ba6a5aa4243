//! Roost Task Graph
//!
//! A small dependency-graph task executor. A [`TaskGraph`] is a declaration-
//! ordered set of named asynchronous tasks; each task may depend on earlier-
//! declared tasks, making the graph acyclic by construction. [`run`] executes
//! the graph, handing every task the resolved values of exactly its declared
//! dependencies, running independent branches concurrently, and skipping the
//! transitive dependents of any failure while unrelated branches continue.
//!
//! A task may also end the run with [`TaskError::Halt`], a distinguished
//! classification meaning "expected, nothing left to do". It short-circuits
//! its dependents like a failure but is reported separately so callers can
//! treat it as success.

mod error;
mod executor;
mod graph;
mod report;

pub use error::{GraphError, TaskError};
pub use executor::run;
pub use graph::{TaskFuture, TaskGraph, TaskInputs};
pub use report::{NodeFailure, RunReport, TaskState};
