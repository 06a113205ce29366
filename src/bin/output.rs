//! Output handling of the integration binary.
//!
//! Every run owns one directory named after the configured prefix, the
//! model kernel, the wall clock and the binary version; the compressed
//! entry stream, the resumable snapshot, the settings copy and the
//! intensity JSON all live there. Entries are handed to a writer thread
//! through a bounded channel, so the integration loop blocks instead of
//! buffering unboundedly when the disk cannot keep up. The stream starts
//! with the settings of the run, followed by the entries, all in the
//! configured encoding behind an LZMA compressor.

use crate::errors::*;
use crate::settings::{OutputFormat, Settings};
use log::debug;
use lzma::LzmaWriter;
use polyscatter::output::OutputEntry;
use polyscatter::Snapshot;
use serde::Serialize;
use std::fs::{DirBuilder, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread;

const LZMA_PRESET: u32 = 6;

enum Packet {
    Metadata(Box<Settings>),
    Entry(Box<OutputEntry>),
    Quit,
}

/// Handle of the writer thread, owning the file layout of one run.
pub struct Worker {
    sender: SyncSender<Packet>,
    handle: thread::JoinHandle<Result<()>>,
    filepath: PathBuf,
    snapshot_path: PathBuf,
    settings_path: PathBuf,
    intensity_path: PathBuf,
}

impl Worker {
    /// Creates the run directory under `root` and starts the writer
    /// thread on the entry stream inside it.
    pub fn new(queue_size: usize, root: &Path, settings: &Settings) -> Result<Worker> {
        let base = run_basename(&settings.environment.prefix, settings.model.name.label());
        let dir = root.join(&base);
        DirBuilder::new()
            .create(&dir)
            .chain_err(|| format!("Unable to create output directory '{}'", dir.display()))?;

        let format = settings.environment.output_format;
        let stream_ext = match format {
            OutputFormat::CBOR => "cbor-lzma",
            OutputFormat::Bincode => "bincode-lzma",
            OutputFormat::MsgPack => "msgpack-lzma",
        };
        let filepath = run_file(&dir, &base, stream_ext);
        let snapshot_path = run_file(&dir, &base, "snapshot");
        let settings_path = run_file(&dir, &base, "toml");
        let intensity_path = run_file(&dir, &base, "json");

        let file = File::create(&filepath)
            .chain_err(|| format!("Unable to create output file '{}'.", filepath.display()))?;
        let mut writer = LzmaWriter::new_compressor(BufWriter::new(file), LZMA_PRESET)
            .map_err(|e| Error::from(format!("Unable to start compressor: {:?}", e)))?;

        let (sender, receiver) = sync_channel(queue_size);

        let handle = thread::spawn(move || -> Result<()> {
            for packet in receiver.iter() {
                match packet {
                    Packet::Metadata(settings) => write_packet(&mut writer, format, &*settings)?,
                    Packet::Entry(entry) => {
                        debug!("Writing output entry.");
                        write_packet(&mut writer, format, &*entry)?
                    }
                    Packet::Quit => break,
                }
            }

            let mut stream = writer
                .finish()
                .map_err(|e| Error::from(format!("Unable to finish compressor: {:?}", e)))?;
            stream
                .flush()
                .chain_err(|| "Unable to flush output file.")?;
            Ok(())
        });

        Ok(Worker {
            sender,
            handle,
            filepath,
            snapshot_path,
            settings_path,
            intensity_path,
        })
    }

    /// Puts the settings of the run at the head of the output stream.
    pub fn write_metadata(&self, settings: Settings) -> Result<()> {
        self.sender
            .send(Packet::Metadata(Box::new(settings)))
            .map_err(|_| Error::from("Output thread is gone."))
    }

    /// Queues an entry for the output stream.
    pub fn append(&self, entry: OutputEntry) -> Result<()> {
        self.sender
            .send(Packet::Entry(Box::new(entry)))
            .map_err(|_| Error::from("Output thread is gone."))
    }

    /// Synchronously (over)writes the resumable snapshot next to the
    /// output stream.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let file = File::create(&self.snapshot_path).chain_err(|| {
            format!(
                "Unable to create snapshot file '{}'.",
                self.snapshot_path.display()
            )
        })?;
        bincode::serialize_into(file, snapshot).chain_err(|| "Unable to write snapshot.")
    }

    pub fn get_output_filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn get_snapshot_filepath(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn get_settings_filepath(&self) -> &Path {
        &self.settings_path
    }

    pub fn get_intensity_filepath(&self) -> &Path {
        &self.intensity_path
    }

    /// Flushes the queue and shuts the writer down.
    pub fn quit(self) -> Result<()> {
        self.sender.send(Packet::Quit).ok();
        drop(self.sender);
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => bail!("Output thread panicked."),
        }
    }

    /// Collects the writer error after a failed `append`.
    pub fn emergency_join(self) -> Result<()> {
        drop(self.sender);
        match self.handle.join() {
            Ok(result) => {
                result?;
                bail!("Output thread stopped unexpectedly.")
            }
            Err(_) => bail!("Output thread panicked."),
        }
    }
}

/// Name shared by all files of one run: prefix, model kernel, wall clock
/// and binary version.
fn run_basename(prefix: &str, model: &str) -> String {
    let version = crate::version().replace(".", "_");
    format!(
        "{prefix}-{model}-{time}_v{version}",
        prefix = prefix,
        model = model,
        time = time::now().strftime("%Y-%m-%d_%H%M%S").unwrap(),
        version = version
    )
}

/// One file of a run. Extensions are appended verbatim, so dots in the
/// prefix do not truncate the name.
fn run_file(dir: &Path, base: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{}", base, ext))
}

fn write_packet<W, T>(writer: &mut W, format: OutputFormat, value: &T) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    match format {
        OutputFormat::CBOR => {
            serde_cbor::to_writer(&mut *writer, value).chain_err(|| "Unable to encode as CBOR.")
        }
        OutputFormat::Bincode => bincode::serialize_into(&mut *writer, value)
            .chain_err(|| "Unable to encode as bincode."),
        OutputFormat::MsgPack => rmp_serde::encode::write(writer, value)
            .chain_err(|| "Unable to encode as MessagePack."),
    }
}
