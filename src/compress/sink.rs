//! Ordered, mutually exclusive output sink for compressed members.
//!
//! Workers finish in whatever order the OS schedules them. Each submitted
//! member carries its chunk's sequence index; the sink parks members that
//! arrive early and writes strictly in index order, so the output is a
//! valid multi-member stream in original-file order. Every write happens
//! under the sink's lock, so no two writes interleave.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use crate::error::GcsvError;

/// Counters reported when the sink is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub members_written: u64,
    pub bytes_written: u64,
    /// Largest number of members parked at once waiting for a predecessor.
    pub peak_pending: usize,
}

struct SinkState<W> {
    writer: W,
    next_index: u64,
    pending: BTreeMap<u64, Vec<u8>>,
    stats: SinkStats,
}

pub struct MemberSink<W: Write> {
    state: Mutex<SinkState<W>>,
}

impl<W: Write> MemberSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: Mutex::new(SinkState {
                writer,
                next_index: 0,
                pending: BTreeMap::new(),
                stats: SinkStats::default(),
            }),
        }
    }

    /// Hand over the compressed member for chunk `index`. Writes it, and any
    /// parked successors, as soon as every earlier index has been written.
    pub fn submit(&self, index: u64, member: Vec<u8>) -> Result<(), GcsvError> {
        let mut state = self.lock()?;
        if index < state.next_index || state.pending.contains_key(&index) {
            return Err(GcsvError::Worker(format!(
                "member {} submitted twice",
                index
            )));
        }
        state.pending.insert(index, member);
        state.stats.peak_pending = state.stats.peak_pending.max(state.pending.len());

        loop {
            let next = state.next_index;
            let Some(member) = state.pending.remove(&next) else {
                break;
            };
            state.writer.write_all(&member)?;
            state.stats.bytes_written += member.len() as u64;
            state.stats.members_written += 1;
            state.next_index += 1;
            tracing::debug!(index = next, bytes = member.len(), "member written");
        }
        Ok(())
    }

    /// Number of members waiting for an earlier index.
    pub fn pending(&self) -> Result<usize, GcsvError> {
        Ok(self.lock()?.pending.len())
    }

    /// Flush the inner writer. Parked members stay parked.
    pub fn flush(&self) -> Result<(), GcsvError> {
        self.lock()?.writer.flush()?;
        Ok(())
    }

    /// Flush and return the writer. Fails if any member is still parked,
    /// which means an earlier index was never submitted.
    pub fn finish(self) -> Result<(W, SinkStats), GcsvError> {
        let mut state = self
            .state
            .into_inner()
            .map_err(|_| GcsvError::Worker("output sink poisoned".to_string()))?;
        if !state.pending.is_empty() {
            return Err(GcsvError::Worker(format!(
                "member {} never arrived; {} later members left unwritten",
                state.next_index,
                state.pending.len()
            )));
        }
        state.writer.flush()?;
        Ok((state.writer, state.stats))
    }

    fn lock(&self) -> Result<MutexGuard<'_, SinkState<W>>, GcsvError> {
        self.state
            .lock()
            .map_err(|_| GcsvError::Worker("output sink poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_submissions_pass_straight_through() {
        let sink = MemberSink::new(Vec::new());
        sink.submit(0, b"aa".to_vec()).unwrap();
        sink.submit(1, b"bb".to_vec()).unwrap();
        assert_eq!(sink.pending().unwrap(), 0);
        let (out, stats) = sink.finish().unwrap();
        assert_eq!(out, b"aabb");
        assert_eq!(stats.members_written, 2);
        assert_eq!(stats.bytes_written, 4);
        assert_eq!(stats.peak_pending, 1);
    }

    #[test]
    fn out_of_order_completions_are_resequenced() {
        // Workers in one batch finishing in reverse order must not reorder
        // the output stream.
        let sink = MemberSink::new(Vec::new());
        sink.submit(3, b"D".to_vec()).unwrap();
        sink.submit(1, b"B".to_vec()).unwrap();
        sink.submit(2, b"C".to_vec()).unwrap();
        assert_eq!(sink.pending().unwrap(), 3);
        sink.submit(0, b"A".to_vec()).unwrap();
        assert_eq!(sink.pending().unwrap(), 0);
        let (out, stats) = sink.finish().unwrap();
        assert_eq!(out, b"ABCD");
        assert_eq!(stats.peak_pending, 4);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let sink = MemberSink::new(Vec::new());
        sink.submit(0, b"A".to_vec()).unwrap();
        assert!(matches!(
            sink.submit(0, b"A".to_vec()),
            Err(GcsvError::Worker(_))
        ));
        sink.submit(2, b"C".to_vec()).unwrap();
        assert!(matches!(
            sink.submit(2, b"C".to_vec()),
            Err(GcsvError::Worker(_))
        ));
    }

    #[test]
    fn gap_is_detected_at_finish() {
        let sink = MemberSink::new(Vec::new());
        sink.submit(0, b"A".to_vec()).unwrap();
        sink.submit(2, b"C".to_vec()).unwrap();
        match sink.finish() {
            Err(GcsvError::Worker(msg)) => assert!(msg.contains("member 1 never arrived")),
            other => panic!("Expected Worker error, got: {:?}", other.map(|(o, _)| o)),
        }
    }

    #[test]
    fn concurrent_submitters_produce_ordered_output() {
        let sink = MemberSink::new(Vec::new());
        std::thread::scope(|scope| {
            for index in (0..64u64).rev() {
                let sink = &sink;
                scope.spawn(move || {
                    sink.submit(index, vec![index as u8; 3]).unwrap();
                });
            }
        });
        let (out, _) = sink.finish().unwrap();
        let expected: Vec<u8> = (0..64u8).flat_map(|i| [i, i, i]).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn poisoned_sink_reports_worker_error() {
        let sink = MemberSink::new(Vec::new());
        std::thread::scope(|scope| {
            let joined = scope
                .spawn(|| {
                    let _guard = sink.state.lock().unwrap();
                    panic!("worker died holding the sink");
                })
                .join();
            assert!(joined.is_err());
        });
        assert!(matches!(sink.pending(), Err(GcsvError::Worker(_))));
        assert!(matches!(sink.submit(0, vec![1]), Err(GcsvError::Worker(_))));
        assert!(matches!(sink.flush(), Err(GcsvError::Worker(_))));
    }

    #[test]
    fn write_failure_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let sink = MemberSink::new(Broken);
        assert!(matches!(
            sink.submit(0, b"A".to_vec()),
            Err(GcsvError::Io { .. })
        ));
    }
}
