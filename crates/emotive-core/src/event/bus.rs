// Copyright 2025 eraflo
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

/// A typed publish/subscribe channel.
///
/// Every call to [`subscribe`](EventBus::subscribe) creates an independent
/// unbounded `flume` channel; [`publish`](EventBus::publish) clones the event
/// into each live channel. Subscribers whose receiver was dropped are pruned on
/// the next publish, so a producer never needs to know who is listening.
#[derive(Debug)]
pub struct EventBus<T: Clone + 'static> {
    subscribers: Vec<flume::Sender<T>>,
    published: u64,
}

impl<T: Clone + 'static> EventBus<T> {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            published: 0,
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(sender);
        log::trace!("EventBus: subscriber added ({} total).", self.subscribers.len());
        receiver
    }

    /// Delivers `event` to every live subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&mut self, event: T) -> usize {
        self.published += 1;
        let before = self.subscribers.len();
        self.subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
        let dropped = before - self.subscribers.len();
        if dropped > 0 {
            log::debug!("EventBus: pruned {dropped} disconnected subscriber(s).");
        }
        self.subscribers.len()
    }

    /// Number of subscribers still connected as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total number of events published over the bus lifetime.
    pub fn published_count(&self) -> u64 {
        self.published
    }
}

impl<T: Clone + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
