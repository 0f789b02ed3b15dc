use std::io::{BufWriter, IntoInnerError, Result, Write};

/// Destination for shaped rows. An empty row is a block separator.
pub trait RowSink {
    fn write_row(&mut self, row: &[String]) -> Result<()>;

    fn blank(&mut self) -> Result<()> {
        self.write_row(&[])
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        (**self).write_row(row)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

pub struct CsvSink<W: Write> {
    pub writer: BufWriter<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writeable: W) -> Self {
        Self {
            writer: BufWriter::new(writeable),
        }
    }

    pub fn into_inner(self) -> std::result::Result<W, IntoInnerError<BufWriter<W>>> {
        self.writer.into_inner()
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        for (i, field) in row.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b",")?;
            }
            write_field(&mut self.writer, field)?;
        }
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()
    }
}

fn write_field<W: Write>(writer: &mut W, field: &str) -> Result<()> {
    if !field.contains([',', '"', '\n', '\r']) {
        return writer.write_all(field.as_bytes());
    }
    writer.write_all(b"\"")?;
    writer.write_all(field.replace('"', "\"\"").as_bytes())?;
    writer.write_all(b"\"")
}

/// Keeps rows in memory.
#[derive(Debug, Default)]
pub struct RowBuffer {
    pub rows: Vec<Vec<String>>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowSink for RowBuffer {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.rows.push(row.to_vec());
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::{CsvSink, RowBuffer, RowSink};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_write_rows() {
        let mut sink = CsvSink::new(Vec::new());
        sink.write_row(&row(&["#measurement point", "bytes (bytes)"]))
            .unwrap();
        sink.write_row(&row(&["PortA", "42.0"])).unwrap();
        sink.blank().unwrap();
        let buf = sink.into_inner().unwrap();
        assert_eq!(buf, b"#measurement point,bytes (bytes)\nPortA,42.0\n\n");
    }

    #[test]
    fn test_quotes_special_fields() {
        let mut sink = CsvSink::new(Vec::new());
        sink.write_row(&row(&["a,b", "say \"hi\"", "line\nbreak", ""]))
            .unwrap();
        let buf = sink.into_inner().unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\"a,b\",\"say \"\"hi\"\"\",\"line\nbreak\",\n"
        );
    }

    fn emit<S: RowSink>(mut sink: S) {
        sink.write_row(&row(&["x"])).unwrap();
        sink.blank().unwrap();
    }

    #[test]
    fn test_row_buffer_through_reference() {
        let mut buffer = RowBuffer::new();
        emit(&mut buffer);
        assert_eq!(buffer.rows, vec![row(&["x"]), vec![]]);
    }
}
