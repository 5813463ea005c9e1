// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the problem
// space: problems, equations and vocabularies.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A math word problem as stored in the dataset
pub mod problem;

// Flat / tree equations and notation conversion
pub mod equation;

// Bidirectional token tables with reserved special tokens
pub mod vocab;

// Core abstractions (traits) that other layers implement
pub mod traits;
