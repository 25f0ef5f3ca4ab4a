/*
 * Copyright (c) 2024 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

//! Contains the CBOR layer this crate's COSE structures are built on: the value model and
//! [`Codec`](cbor::Codec), and the [tag extension mechanism](tags).

pub mod cbor;
/// Tag numbers, header labels, key parameter labels and structure contexts.
pub mod constants;
pub mod tags;
