//! Integration Tests Module
//!
//! End-to-end tests for the refinement loop. The scenario executor and fix
//! agent are scripted in-process implementations of the service traits, so
//! no container runtime and no LLM calls are involved; the checkpoint store
//! runs against real temporary directories.

// Refinement loop behavior: fork sequencing, termination, session threading
mod refinement_test;

// Checkpoint persistence across store instances
mod checkpoint_test;
