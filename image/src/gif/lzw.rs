//! LZW decompression for GIF image data.
//!
//! The compressed stream arrives chopped into data sub-blocks (one length
//! byte, then up to 255 payload bytes, a zero length ending the chain) and
//! carries codes of growing width, 3 to 12 bits. The decoder keeps a small
//! byte window over the current sub-blocks, a 4096-entry prefix/suffix
//! dictionary, and a LIFO stack it unwinds one palette index at a time.

use rasterkit_fs::ByteStream;

use crate::DecodeError;

const MAX_BITS: u32 = 12;
const TABLE_SIZE: usize = 1 << MAX_BITS;
const WINDOW: usize = 300;

pub(crate) struct LzwDecoder {
    min_code_size: u32,
    code_size: u32,
    clear_code: u32,
    end_code: u32,
    max_code_size: u32,
    next_code: u32,
    first_time: bool,
    old_code: u32,
    first_code: u32,

    window: [u8; WINDOW],
    cur_bit: usize,
    last_bit: usize,
    last_byte: usize,
    done: bool,

    prefix: [u16; TABLE_SIZE],
    suffix: [u8; TABLE_SIZE],
    stack: [u8; TABLE_SIZE],
    sp: usize,
}

impl LzwDecoder {
    /// Initialise from the LZW minimum code size byte that leads the image
    /// data.
    pub(crate) fn new(min_code_size: u8) -> Result<Self, DecodeError> {
        let min = min_code_size as u32;
        if min == 0 || min >= MAX_BITS {
            return Err(DecodeError::Corrupt);
        }
        let clear = 1u32 << min;
        let mut dec = Self {
            min_code_size: min,
            code_size: min + 1,
            clear_code: clear,
            end_code: clear + 1,
            max_code_size: 2 * clear,
            next_code: clear + 2,
            first_time: true,
            old_code: 0,
            first_code: 0,
            window: [0; WINDOW],
            cur_bit: 0,
            last_bit: 0,
            last_byte: 2,
            done: false,
            prefix: [0; TABLE_SIZE],
            suffix: [0; TABLE_SIZE],
            stack: [0; TABLE_SIZE],
            sp: 0,
        };
        dec.reset_table();
        Ok(dec)
    }

    /// Produce the next palette index.
    pub(crate) fn next_index<R: ByteStream>(&mut self, r: &mut R) -> Result<u8, DecodeError> {
        if self.first_time {
            // The stream opens as if a clear code had just been seen; skip
            // any literal clears and take the first real code as output.
            self.first_time = false;
            return self.read_first_code(r);
        }

        if self.sp > 0 {
            self.sp -= 1;
            return Ok(self.stack[self.sp]);
        }

        loop {
            let code = self.get_code(r)?.ok_or(DecodeError::Corrupt)?;

            if code == self.clear_code {
                self.reset_table();
                return self.read_first_code(r);
            }
            if code == self.end_code {
                // The frame still expected pixels; a well-formed stream
                // only ends once the compositor stops asking.
                return Err(DecodeError::Corrupt);
            }

            let incoming = code;
            let mut code = code;
            if code >= self.next_code {
                // KwKwK: the code being defined right now. Emit the first
                // character of the previous string, then decode from it.
                self.push(self.first_code as u8)?;
                code = self.old_code;
            }
            while code >= self.clear_code {
                let i = code as usize;
                if i >= TABLE_SIZE || code == self.prefix[i] as u32 {
                    return Err(DecodeError::Corrupt);
                }
                self.push(self.suffix[i])?;
                code = self.prefix[i] as u32;
            }
            self.first_code = self.suffix[code as usize] as u32;
            self.push(self.first_code as u8)?;

            if (self.next_code as usize) < TABLE_SIZE {
                let i = self.next_code as usize;
                self.prefix[i] = self.old_code as u16;
                self.suffix[i] = self.first_code as u8;
                self.next_code += 1;
                if self.next_code >= self.max_code_size && self.code_size < MAX_BITS {
                    self.max_code_size *= 2;
                    self.code_size += 1;
                }
            }
            self.old_code = incoming;

            if self.sp > 0 {
                self.sp -= 1;
                return Ok(self.stack[self.sp]);
            }
        }
    }

    fn read_first_code<R: ByteStream>(&mut self, r: &mut R) -> Result<u8, DecodeError> {
        loop {
            let code = self.get_code(r)?.ok_or(DecodeError::Corrupt)?;
            if code == self.clear_code {
                continue;
            }
            if code >= self.clear_code {
                // The first code after a clear must be a literal.
                return Err(DecodeError::Corrupt);
            }
            self.first_code = code;
            self.old_code = code;
            return Ok(code as u8);
        }
    }

    fn reset_table(&mut self) {
        self.prefix.fill(0);
        self.suffix.fill(0);
        for i in 0..self.clear_code {
            self.suffix[i as usize] = i as u8;
        }
        self.code_size = self.min_code_size + 1;
        self.max_code_size = 2 * self.clear_code;
        self.next_code = self.clear_code + 2;
        self.sp = 0;
    }

    fn push(&mut self, v: u8) -> Result<(), DecodeError> {
        if self.sp >= self.stack.len() {
            return Err(DecodeError::Corrupt);
        }
        self.stack[self.sp] = v;
        self.sp += 1;
        Ok(())
    }

    /// Pull the next `code_size` bits, refilling the window from data
    /// sub-blocks as needed. `None` once the terminator block has been
    /// consumed and the window is dry.
    fn get_code<R: ByteStream>(&mut self, r: &mut R) -> Result<Option<u32>, DecodeError> {
        if self.cur_bit + self.code_size as usize >= self.last_bit {
            if self.done {
                return Ok(None);
            }
            // Keep the last two bytes so a code straddling the refill
            // stays addressable, then append the next sub-block.
            self.window[0] = self.window[self.last_byte - 2];
            self.window[1] = self.window[self.last_byte - 1];
            let count = read_sub_block(r, &mut self.window[2..])?;
            if count == 0 {
                self.done = true;
            }
            self.cur_bit = self.cur_bit + 16 - self.last_bit;
            self.last_byte = 2 + count;
            self.last_bit = self.last_byte * 8;
        }

        let mut value = 0u32;
        for j in 0..self.code_size as usize {
            let bit = self.cur_bit + j;
            if (self.window[bit >> 3] >> (bit & 7)) & 1 != 0 {
                value |= 1 << j;
            }
        }
        self.cur_bit += self.code_size as usize;
        Ok(Some(value))
    }
}

/// Read one data sub-block into `buf`, returning its length; zero marks
/// the end of the chain.
pub(crate) fn read_sub_block<R: ByteStream>(
    r: &mut R,
    buf: &mut [u8],
) -> Result<usize, DecodeError> {
    let len = r.read_u8()? as usize;
    if len == 0 {
        return Ok(0);
    }
    r.read_exact(&mut buf[..len])?;
    Ok(len)
}

/// Drain data sub-blocks up to and including the terminator.
pub(crate) fn drain_sub_blocks<R: ByteStream>(r: &mut R) -> Result<(), DecodeError> {
    loop {
        let len = r.read_u8()? as u64;
        if len == 0 {
            return Ok(());
        }
        r.skip(len)?;
    }
}
