// Copyright 2025 Framewire Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Framewire CLI
//!
//! Command-line tools for the framewire framing layer.
//!
//! - `framewire serve`: framed echo server, one thread per connection
//! - `framewire send`: one framed request/response exchange, reply to stdout
//!
//! The binary parses arguments with `argh` and calls into [`commands`].

pub mod commands;
