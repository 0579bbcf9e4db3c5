// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Third-party service providers.

pub mod elevenlabs;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsError, SynthesizedSpeech, VoiceSample};
