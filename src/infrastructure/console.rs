//! Line input shared by the command loop and the directory prompt

use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

type LineSource = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Reads one line at a time from the terminal (or any reader)
pub struct PromptInput {
    lines: Mutex<LineSource>,
}

impl PromptInput {
    /// Read from standard input
    pub fn from_stdin() -> Self {
        Self::from_reader(io::stdin())
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let boxed: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            lines: Mutex::new(BufReader::new(boxed).lines()),
        }
    }

    /// Next line without its terminator, or `None` at end of input
    pub async fn read_line(&self) -> io::Result<Option<String>> {
        self.lines.lock().await.next_line().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let input = PromptInput::from_reader(&b"start\r\nstop\n"[..]);
        assert_eq!(input.read_line().await.unwrap(), Some("start".to_string()));
        assert_eq!(input.read_line().await.unwrap(), Some("stop".to_string()));
        assert_eq!(input.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_line_is_not_eof() {
        let input = PromptInput::from_reader(&b"\nquit\n"[..]);
        assert_eq!(input.read_line().await.unwrap(), Some(String::new()));
        assert_eq!(input.read_line().await.unwrap(), Some("quit".to_string()));
    }
}
