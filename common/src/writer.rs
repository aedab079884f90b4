//! Tab indented line output shared by the map writers.
use std::io::{self, Write};

pub struct LineWriter<W: Write> {
    inner: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// `tabs` tabs, `text`, newline.
    pub fn line(&mut self, tabs: usize, text: &str) -> io::Result<()> {
        for _ in 0..tabs {
            self.inner.write_all(b"\t")?;
        }

        self.inner.write_all(text.as_bytes())?;
        self.inner.write_all(b"\n")
    }

    /// `"key" "value"` on its own line.
    pub fn keyvalue(&mut self, tabs: usize, key: &str, value: &str) -> io::Result<()> {
        self.line(tabs, &format!("\"{key}\" \"{value}\""))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// `%.6f`
pub fn fixed6(value: f64) -> String {
    format!("{value:.6}")
}

/// `%.16f`
pub fn fixed16(value: f64) -> String {
    format!("{value:.16}")
}

/// `%+013.6f`, the fixed width brush coordinate format.
pub fn signed_fixed(value: f64) -> String {
    format!("{value:+013.6}")
}

/// Float truncated toward zero, printed as an integer.
pub fn truncated(value: f64) -> String {
    format!("{}", value.trunc() as i64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lines() {
        let mut writer = LineWriter::new(vec![]);

        writer.line(0, "world").unwrap();
        writer.line(0, "{").unwrap();
        writer.keyvalue(1, "id", "1").unwrap();
        writer.line(0, "}").unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(out, "world\n{\n\t\"id\" \"1\"\n}\n");
    }

    #[test]
    fn float_formats() {
        assert_eq!(fixed6(0.25), "0.250000");
        assert_eq!(fixed6(-1.), "-1.000000");
        assert_eq!(fixed16(1. / 128.), "0.0078125000000000");
        assert_eq!(signed_fixed(-1024.), "-01024.000000");
        assert_eq!(signed_fixed(0.061266), "+00000.061266");
        assert_eq!(signed_fixed(1.5), "+00001.500000");
        assert_eq!(truncated(-3.9), "-3");
        assert_eq!(truncated(127.99), "127");
    }
}
