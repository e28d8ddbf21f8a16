// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! These tests drive several subsystems together from multiple host
//! threads: futexes with real blocking, waits canceled by handle close,
//! and ports fed by object signals.

mod port_tests;
