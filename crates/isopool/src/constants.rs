// Copyright (c) The isopool Authors.
// Licensed under the MIT License.

// Shared literal messages, following the teacher crate's convention of pulling such strings into
// one place instead of scattering `.expect("...")` literals across the crate.

pub(crate) const ERR_POISONED_LOCK: &str = "a lock guarding pool state was poisoned by a panic";
