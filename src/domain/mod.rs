// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// system works with: digit images, predictions, and the
// abstractions over where samples come from.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Digit images, dataset splits and predictions
pub mod digit;

// Core abstractions (traits) that other layers implement
pub mod traits;
