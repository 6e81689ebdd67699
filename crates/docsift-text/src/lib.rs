// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docsift-text: everything that happens to recognized text after it leaves
// the recognizer. Normalization, quality review, entity extraction, tagging,
// HTML stripping, and page-marker handling.

pub mod entities;
pub mod html;
pub mod normalize;
pub mod pages;
pub mod quality;
pub mod tags;

pub use entities::extract_entities;
pub use html::html_to_text;
pub use normalize::normalize;
pub use pages::{page_marker, push_page, split_pages};
pub use quality::{QualityChecker, QualityReport};
pub use tags::generate_tags;
