/// ソーステキストを文字単位で走査するためのバッファ
///
/// 文字とそのバイトオフセットを事前にデコードして保持する。
/// 終端は `None` で表現し、終端以降に `advance` を呼び出しても常に `None` を返す。
///
/// # Examples
///
/// ```
/// use parser::source_buffer::SourceBuffer;
///
/// let mut buffer = SourceBuffer::new("a\nb");
/// assert_eq!(buffer.advance(), Some('a'));
/// assert_eq!(buffer.advance(), Some('\n'));
/// assert_eq!(buffer.advance(), Some('b'));
/// assert_eq!(buffer.position(), (2, 1));
/// assert_eq!(buffer.advance(), None);
/// ```
#[derive(Debug)]
pub struct SourceBuffer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    cursor: usize,
    line: u32,
    column: u32,
}

impl<'a> SourceBuffer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            cursor: 0,
            line: 1,
            column: 0,
        }
    }

    /// 現在位置の文字を返して1文字進める
    /// 改行 (`\n`、単独の `\r`) を消費した場合は行を進めて列を0に戻す
    /// `\r\n` は `\n` の側で1回だけ行を進める
    pub fn advance(&mut self) -> Option<char> {
        let (_, c) = *self.chars.get(self.cursor)?;
        self.cursor += 1;
        self.column += 1;

        let newline = match c {
            '\n' => true,
            '\r' => self.peek() != Some('\n'),
            _ => false,
        };
        if newline {
            self.line += 1;
            self.column = 0;
        }

        Some(c)
    }

    /// `n` 文字まとめて進め、進んだ先の文字を返す
    /// 範囲外に出る場合はカーソルを動かさずに `None` を返す
    pub fn advance_n(&mut self, n: usize) -> Option<char> {
        if self.cursor + n > self.chars.len() {
            return None;
        }
        for _ in 0..n {
            self.advance();
        }

        self.peek()
    }

    pub fn peek(&self) -> Option<char> {
        self.peek_n(0)
    }

    /// カーソルを動かさずに `n` 文字先を返す
    pub fn peek_n(&self, n: usize) -> Option<char> {
        self.chars.get(self.cursor + n).map(|&(_, c)| c)
    }

    /// カーソルを動かさずに `n` 文字前を返す
    /// `previous(1)` は直前に消費した文字
    pub fn previous(&self, n: usize) -> Option<char> {
        let index = self.cursor.checked_sub(n)?;
        self.chars.get(index).map(|&(_, c)| c)
    }

    /// カーソル位置のバイトオフセット (終端ではソースの長さ)
    pub fn offset(&self) -> usize {
        self.chars
            .get(self.cursor)
            .map_or(self.source.len(), |&(offset, _)| offset)
    }

    /// 直前に消費した文字の (行, 列)
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.source.get(start..end).unwrap_or_default()
    }
}
