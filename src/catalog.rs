use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::emote::EmoteRecord;

pub const HEADER: [&str; 5] = ["RowName", "Id", "Code", "Texture", "Size"];
/// Content root the textures get imported under.
pub const ASSET_ROOT: &str = "/TwitchChat/Emotes";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl From<(u32, u32)> for Size {
    fn from((w, h): (u32, u32)) -> Self {
        Self {
            x: w as f64,
            y: h as f64,
        }
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(X={:.6},Y={:.6})", self.x, self.y)
    }
}

impl Serialize for Size {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogRow {
    pub row_name: String,
    pub id: String,
    pub code: String,
    pub texture: String,
    pub size: Size,
}

/// Hands out row names and texture paths.
///
/// Channel names are `<channel>_<n>` with `n` counting rows actually
/// produced, so skipped emotes leave no gaps.
#[derive(Debug, Clone)]
pub enum RowNaming {
    Channel { channel: String, count: usize },
    Global,
}

impl RowNaming {
    pub fn channel(channel: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            count: 0,
        }
    }

    pub fn texture_path(&self, id: &str) -> String {
        match self {
            RowNaming::Channel { channel, .. } => {
                format!("{ASSET_ROOT}/ChannelEmotes/{channel}/{id}.{id}")
            }
            RowNaming::Global => format!("{ASSET_ROOT}/GlobalEmotes/{id}.{id}"),
        }
    }

    pub fn row(&mut self, record: &EmoteRecord, size: (u32, u32)) -> CatalogRow {
        let texture = self.texture_path(&record.id);
        let row_name = match self {
            RowNaming::Channel { channel, count } => {
                *count += 1;
                format!("{channel}_{count}")
            }
            RowNaming::Global => record.id.clone(),
        };
        CatalogRow {
            row_name,
            id: record.id.clone(),
            code: record.name.clone(),
            texture,
            size: size.into(),
        }
    }
}

pub struct Catalog<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl Catalog<File> {
    pub fn create(path: impl AsRef<Path>) -> csv::Result<Self> {
        Self::new(File::create(path.as_ref())?)
    }
}

impl<W: Write> Catalog<W> {
    /// Writes the header right away, an empty run still yields a valid file.
    pub fn new(inner: W) -> csv::Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Serializes and flushes `row`, so a failing disk surfaces on the row
    /// that hit it.
    pub fn append(&mut self, row: &CatalogRow) -> csv::Result<()> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> std::io::Result<W> {
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> EmoteRecord {
        EmoteRecord {
            id: id.into(),
            name: name.into(),
            format: vec!["static".into()],
            scale: vec!["1.0".into()],
            theme_mode: vec!["light".into()],
        }
    }

    fn written(catalog: Catalog<Vec<u8>>) -> String {
        String::from_utf8(catalog.finish().unwrap()).unwrap()
    }

    #[test]
    fn size_uses_six_decimals() {
        assert_eq!(Size::from((28, 28)).to_string(), "(X=28.000000,Y=28.000000)");
        assert_eq!(Size::from((0, 0)).to_string(), "(X=0.000000,Y=0.000000)");
    }

    #[test]
    fn channel_rows_count_from_one() {
        let mut naming = RowNaming::channel("ninja");
        let first = naming.row(&record("emote123", "Kappa"), (28, 28));
        let second = naming.row(&record("emote456", "PogChamp"), (56, 56));

        assert_eq!(first.row_name, "ninja_1");
        assert_eq!(second.row_name, "ninja_2");
        assert_eq!(
            first.texture,
            "/TwitchChat/Emotes/ChannelEmotes/ninja/emote123.emote123"
        );
    }

    #[test]
    fn global_rows_are_named_by_id() {
        let mut naming = RowNaming::Global;
        let row = naming.row(&record("25", "Kappa"), (112, 112));
        assert_eq!(row.row_name, "25");
        assert_eq!(row.texture, "/TwitchChat/Emotes/GlobalEmotes/25.25");
    }

    #[test]
    fn header_is_written_even_without_rows() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert_eq!(written(catalog), "RowName,Id,Code,Texture,Size\r\n");
    }

    #[test]
    fn rows_are_quoted_where_needed() {
        let mut catalog = Catalog::new(Vec::new()).unwrap();
        let row = RowNaming::channel("ninja").row(&record("emote123", "Kappa"), (28, 28));
        catalog.append(&row).unwrap();
        assert_eq!(catalog.rows(), 1);

        let text = written(catalog);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "RowName,Id,Code,Texture,Size",
                r#"ninja_1,emote123,Kappa,/TwitchChat/Emotes/ChannelEmotes/ninja/emote123.emote123,"(X=28.000000,Y=28.000000)""#,
            ]
        );
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn append_reports_write_failure() {
        let mut catalog = Catalog::new(FullDisk).unwrap();
        let row = RowNaming::Global.row(&record("25", "Kappa"), (28, 28));
        assert!(catalog.append(&row).is_err());
        assert_eq!(catalog.rows(), 0);
    }
}
