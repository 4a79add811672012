//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Which side initiated a connection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side opened a connection.
///
/// Requests flow both ways over any identified connection, but peers prefer
/// connections they opened themselves when picking one for outgoing traffic.
///
/// # Examples
///
/// ```rust
/// use tchannel::connection::Direction;
///
/// let direction = Direction::Outgoing;
/// assert!(direction.is_outgoing());
/// assert_eq!(direction.reverse(), Direction::Incoming);
/// assert_eq!(direction.to_string(), "out");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Opened by this channel.
    Outgoing,

    /// Accepted from a remote channel.
    Incoming,
}

impl Direction {
    /// Returns `true` for [`Outgoing`](Self::Outgoing).
    #[inline]
    #[must_use]
    pub fn is_outgoing(&self) -> bool {
        matches!(self, Self::Outgoing)
    }

    /// Returns `true` for [`Incoming`](Self::Incoming).
    #[inline]
    #[must_use]
    pub fn is_incoming(&self) -> bool {
        matches!(self, Self::Incoming)
    }

    /// The direction as seen from the other end.
    #[must_use]
    pub fn reverse(&self) -> Self {
        match self {
            Self::Outgoing => Self::Incoming,
            Self::Incoming => Self::Outgoing,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Outgoing => "out",
            Self::Incoming => "in",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
