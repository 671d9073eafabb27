//! Runtime value model shared by the evaluator and the front end: tagged
//! values, memory spaces, and the runtime error taxonomy.

pub mod error;
pub mod space;
pub mod value;
