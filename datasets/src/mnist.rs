//! The MNIST database as four uncompressed IDX files (all integers big-endian):
//!
//! * images: `magic (2051) | count | rows | cols | pixels...`
//! * labels: `magic (2049) | count | labels...`

use std::{
    fs::{self, File},
    io::Read,
    path::PathBuf,
};

use log::debug;

use crate::{
    DataErr, Result,
    provider::{DatasetInfo, DatasetProvider, RawSplit, Split},
};

pub const MNIST: &str = "mnist";
pub const NUM_CLASSES: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// Serves MNIST out of a directory holding its four standard IDX files.
#[derive(Debug, Clone)]
pub struct MnistIdxProvider {
    dir: PathBuf,
}

impl MnistIdxProvider {
    /// Creates a new `MnistIdxProvider`.
    ///
    /// # Arguments
    /// * `dir` - The directory holding `train-images-idx3-ubyte`, `train-labels-idx1-ubyte`,
    ///   `t10k-images-idx3-ubyte` and `t10k-labels-idx1-ubyte`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_names(split: Split) -> (&'static str, &'static str) {
        match split {
            Split::Train => ("train-images-idx3-ubyte", "train-labels-idx1-ubyte"),
            Split::Test => ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte"),
        }
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        let path = self.dir.join(name);

        if !path.is_file() {
            return Err(DataErr::MissingFile(path));
        }

        Ok(path)
    }

    fn check_name(name: &str) -> Result<()> {
        if name != MNIST {
            return Err(DataErr::UnknownDataset(name.to_string()));
        }

        Ok(())
    }

    /// Reads the image header of a split without loading its pixels.
    fn header(&self, split: Split) -> Result<(usize, usize, usize)> {
        let (images, _) = Self::file_names(split);
        let mut header = [0; 16];

        let mut file = File::open(self.path(images)?)?;
        let read = file.read(&mut header)?;
        parse_idx3_header(&header[..read])
    }
}

impl DatasetProvider for MnistIdxProvider {
    fn info(&self, name: &str) -> Result<DatasetInfo> {
        Self::check_name(name)?;

        let (train_examples, rows, cols) = self.header(Split::Train)?;
        let (test_examples, ..) = self.header(Split::Test)?;

        Ok(DatasetInfo {
            name: MNIST.to_string(),
            num_classes: NUM_CLASSES,
            image_shape: (rows, cols, 1),
            train_examples,
            test_examples,
        })
    }

    fn load(&self, name: &str, split: Split) -> Result<RawSplit> {
        Self::check_name(name)?;

        let (images, labels) = Self::file_names(split);
        let images = fs::read(self.path(images)?)?;
        let labels = fs::read(self.path(labels)?)?;
        debug!("read {} image and {} label bytes", images.len(), labels.len());

        let (count, rows, cols, pixels) = parse_idx3_images(&images)?;
        let labels = parse_idx1_labels(&labels)?;

        if count != labels.len() {
            return Err(DataErr::CountMismatch {
                images: count,
                labels: labels.len(),
            });
        }

        RawSplit::new((rows, cols, 1), pixels.to_vec(), labels.to_vec())
    }
}

/// Reads a big-endian u32 from `data` at byte offset `off`.
fn read_u32_be(data: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn check_len(what: &'static str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(DataErr::Truncated {
            what,
            expected,
            got: data.len(),
        });
    }

    Ok(())
}

fn parse_idx3_header(data: &[u8]) -> Result<(usize, usize, usize)> {
    check_len("IDX3 header", data, 16)?;

    let magic = read_u32_be(data, 0);
    if magic != IMAGES_MAGIC {
        return Err(DataErr::InvalidMagic {
            expected: IMAGES_MAGIC,
            got: magic,
        });
    }

    let count = read_u32_be(data, 4) as usize;
    let rows = read_u32_be(data, 8) as usize;
    let cols = read_u32_be(data, 12) as usize;
    Ok((count, rows, cols))
}

/// Parses an IDX3 image file.
///
/// # Returns
/// The image count, rows, cols and every pixel back to back.
pub fn parse_idx3_images(data: &[u8]) -> Result<(usize, usize, usize, &[u8])> {
    let (count, rows, cols) = parse_idx3_header(data)?;

    let end = count
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| DataErr::InvalidHeader {
            what: "IDX3 header",
            dims: vec![count, rows, cols],
        })?;

    check_len("IDX3 file", data, end)?;
    Ok((count, rows, cols, &data[16..end]))
}

/// Parses an IDX1 label file.
pub fn parse_idx1_labels(data: &[u8]) -> Result<&[u8]> {
    check_len("IDX1 header", data, 8)?;

    let magic = read_u32_be(data, 0);
    if magic != LABELS_MAGIC {
        return Err(DataErr::InvalidMagic {
            expected: LABELS_MAGIC,
            got: magic,
        });
    }

    let count = read_u32_be(data, 4) as usize;
    let end = count.checked_add(8).ok_or_else(|| DataErr::InvalidHeader {
        what: "IDX1 header",
        dims: vec![count],
    })?;

    check_len("IDX1 file", data, end)?;
    Ok(&data[8..end])
}

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use super::*;

    /// Builds IDX3 image bytes out of raw images.
    fn build_idx3_bytes(images: &[&[u8]], rows: u32, cols: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&IMAGES_MAGIC.to_be_bytes());
        buf.extend_from_slice(&(images.len() as u32).to_be_bytes());
        buf.extend_from_slice(&rows.to_be_bytes());
        buf.extend_from_slice(&cols.to_be_bytes());
        images.iter().for_each(|img| buf.extend_from_slice(img));
        buf
    }

    /// Builds IDX1 label bytes.
    fn build_idx1_bytes(labels: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&LABELS_MAGIC.to_be_bytes());
        buf.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        buf.extend_from_slice(labels);
        buf
    }

    /// Writes a tiny MNIST-shaped dataset (`rows x cols` images) into `dir`.
    fn write_idx_files(
        dir: &Path,
        rows: u32,
        cols: u32,
        train: (&[&[u8]], &[u8]),
        test: (&[&[u8]], &[u8]),
    ) -> Result<()> {
        fs::create_dir_all(dir)?;

        for (split, (images, labels)) in [(Split::Train, train), (Split::Test, test)] {
            let (images_name, labels_name) = MnistIdxProvider::file_names(split);
            fs::write(dir.join(images_name), build_idx3_bytes(images, rows, cols))?;
            fs::write(dir.join(labels_name), build_idx1_bytes(labels))?;
        }

        Ok(())
    }

    fn temp_dir(name: &str) -> PathBuf {
        env::temp_dir().join(format!("mnist-{name}-{}", std::process::id()))
    }

    #[test]
    fn parse_idx3() {
        let bytes = build_idx3_bytes(&[&[0; 4], &[255; 4]], 2, 2);
        let (count, rows, cols, pixels) = parse_idx3_images(&bytes).unwrap();

        assert_eq!((count, rows, cols), (2, 2, 2));
        assert_eq!(pixels, [0, 0, 0, 0, 255, 255, 255, 255]);
    }

    #[test]
    fn parse_idx1() {
        let bytes = build_idx1_bytes(&[0, 1, 2, 9, 5]);
        assert_eq!(parse_idx1_labels(&bytes).unwrap(), [0, 1, 2, 9, 5]);
    }

    #[test]
    fn invalid_magic() {
        let mut bytes = build_idx3_bytes(&[&[0; 4]], 2, 2);
        bytes[3] = 99;
        assert!(matches!(
            parse_idx3_images(&bytes),
            Err(DataErr::InvalidMagic { expected: 2051, .. })
        ));

        let mut bytes = build_idx1_bytes(&[0, 1]);
        bytes[3] = 99;
        assert!(matches!(
            parse_idx1_labels(&bytes),
            Err(DataErr::InvalidMagic { expected: 2049, .. })
        ));
    }

    #[test]
    fn impossible_headers_are_errors() {
        let mut bytes = IMAGES_MAGIC.to_be_bytes().to_vec();
        for _ in 0..3 {
            bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        }

        assert!(matches!(
            parse_idx3_images(&bytes),
            Err(DataErr::InvalidHeader { what: "IDX3 header", .. })
        ));
    }

    #[test]
    fn truncated_files() {
        let bytes = build_idx3_bytes(&[&[0; 4], &[0; 4]], 2, 2);
        assert!(matches!(
            parse_idx3_images(&bytes[..bytes.len() - 1]),
            Err(DataErr::Truncated { .. })
        ));
        assert!(matches!(
            parse_idx1_labels(&[0, 0]),
            Err(DataErr::Truncated { .. })
        ));
    }

    #[test]
    fn provider_reads_a_directory() {
        let dir = temp_dir("provider");
        let train: [&[u8]; 3] = [&[1; 4], &[2; 4], &[3; 4]];
        let test: [&[u8]; 1] = [&[4; 4]];
        write_idx_files(&dir, 2, 2, (&train, &[0, 1, 2]), (&test, &[7])).unwrap();

        let provider = MnistIdxProvider::new(&dir);
        let info = provider.info(MNIST).unwrap();
        assert_eq!(info.image_shape, (2, 2, 1));
        assert_eq!((info.train_examples, info.test_examples), (3, 1));

        let split = provider.load(MNIST, Split::Train).unwrap();
        assert_eq!(split.labels, [0, 1, 2]);
        assert_eq!(split.pixels[4..8], [2; 4]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_files_and_unknown_names() {
        let provider = MnistIdxProvider::new(temp_dir("missing"));

        assert!(matches!(
            provider.load(MNIST, Split::Test),
            Err(DataErr::MissingFile(_))
        ));
        assert!(matches!(
            provider.info("cifar10"),
            Err(DataErr::UnknownDataset(_))
        ));
    }

    #[test]
    fn mismatched_counts() {
        let dir = temp_dir("counts");
        let images: [&[u8]; 2] = [&[0; 4], &[0; 4]];
        write_idx_files(&dir, 2, 2, (&images, &[0]), (&images, &[0, 1])).unwrap();

        let provider = MnistIdxProvider::new(&dir);
        assert!(matches!(
            provider.load(MNIST, Split::Train),
            Err(DataErr::CountMismatch { images: 2, labels: 1 })
        ));

        fs::remove_dir_all(dir).unwrap();
    }
}
