//! The generation pipelines.
//!
//! Both follow the same shape: post a transient pending placeholder,
//! call the external planner, then commit the result, the phase
//! transition, and the placeholder deletion as one atomic store write.
//! Callers hold the trip lock across the whole pipeline.

mod detailed;
mod options;
