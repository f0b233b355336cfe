// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Monitoring: Prometheus metrics.

pub mod metrics;
