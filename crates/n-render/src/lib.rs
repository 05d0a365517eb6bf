// SPDX-License-Identifier: MIT
//
// n-render: terminal rendering pipeline for n-dash.
//
// A tree of renderable nodes goes in; one escape-sequence stream per frame
// comes out. In between:
//
//   walker   → paints the tree into a cell buffer, serving unchanged
//              subtrees from a fingerprint-keyed surface cache
//   diff     → compares the buffer with the last written frame
//   encoder  → turns the diff into bytes, skipping redundant SGR codes
//   pump     → runs one frame at a time and coalesces updates behind it
//   guard    → admits one encode and one write per frame, no more
//
// The renderer never owns the terminal. It writes to an `OutputSink`, which
// is stdout for a live dashboard and an in-memory capture for tests.

pub mod ansi;
pub mod buffer;
pub mod cache;
pub mod cell;
pub mod config;
pub mod diff;
pub mod encoder;
pub mod env;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod guard;
pub mod node;
pub mod pump;
pub mod renderer;
pub mod sink;
pub mod telemetry;
pub mod terminal;
pub mod walker;
