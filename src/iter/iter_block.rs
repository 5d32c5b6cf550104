use crate::iter::util::Cancellation;
use crate::parser::chains::Blockchain;
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::proto::block::Block;
use crate::parser::reader::BlockReader;
use log::warn;

///
/// Parse blocks one by one, in archive order.
///
/// Stops at the first error (read failure, parse failure or cancellation),
/// which is yielded once; the reader is closed at that point.
///
pub struct BlockIter<'a, C: ?Sized> {
    reader: &'a mut BlockReader,
    chain: &'a C,
    cancel: Option<Cancellation>,
    done: bool,
}

impl<'a, C> BlockIter<'a, C>
where
    C: Blockchain + ?Sized,
{
    pub fn new(reader: &'a mut BlockReader, chain: &'a C) -> Self {
        BlockIter {
            reader,
            chain,
            cancel: None,
            done: false,
        }
    }

    /// check `cancel` before pulling each record
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn fail(&mut self, err: OpError) -> Option<OpResult<Block>> {
        warn!("stopping {} analysis: {}", self.chain.name(), err);
        self.done = true;
        self.reader.close();
        Some(Err(err))
    }
}

impl<'a, C> Iterator for BlockIter<'a, C>
where
    C: Blockchain + ?Sized,
{
    type Item = OpResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.as_ref().map_or(false, Cancellation::is_cancelled) {
            let err = OpError::new(OpErrorKind::Cancelled)
                .with_path(self.reader.path())
                .at_line(self.reader.lines_read());
            return self.fail(err);
        }
        match self.reader.next_block() {
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => self.fail(err),
            Ok(Some(raw)) => match self.chain.parse_block(&raw.data) {
                Ok(block) => Some(Ok(block)),
                Err(err) => {
                    let err = OpError::from(err)
                        .with_path(self.reader.path())
                        .at_line(raw.line);
                    self.fail(err)
                }
            },
        }
    }
}
