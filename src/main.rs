use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};

use textpage_pdf::{Alignment, Document, FormattingOptions, TextStatistics};

/// Export a plain-text file to a paginated PDF.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Input text file (UTF-8)
    input: PathBuf,

    /// Output PDF path (defaults to the input path with a .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Document title (defaults to the input file stem)
    #[arg(long)]
    title: Option<String>,

    /// Body font family
    #[arg(long, default_value = "Helvetica")]
    font_family: String,

    /// Body font size in points
    #[arg(long, default_value_t = 16.0)]
    font_size: f32,

    /// Line height multiplier
    #[arg(long, default_value_t = 1.2)]
    line_spacing: f32,

    /// Body text alignment
    #[arg(long, value_enum, default_value_t = AlignArg::Left)]
    align: AlignArg,

    /// Language code shown in the metadata block
    #[arg(long, default_value = "en")]
    language: String,

    /// Print text statistics for the input and exit without rendering
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for Alignment {
    fn from(a: AlignArg) -> Self {
        match a {
            AlignArg::Left => Alignment::Left,
            AlignArg::Center => Alignment::Center,
            AlignArg::Right => Alignment::Right,
        }
    }
}

fn file_timestamps(path: &Path) -> (DateTime<Utc>, DateTime<Utc>) {
    let epoch = DateTime::<Utc>::default();
    let Ok(meta) = std::fs::metadata(path) else {
        return (epoch, epoch);
    };
    let modified = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(epoch);
    // Creation time is unavailable on some filesystems; fall back to mtime
    let created = meta
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified);
    (created, modified)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let body = match std::fs::read_to_string(&args.input) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    if args.stats {
        let stats = TextStatistics::of(&body);
        println!("words:               {}", stats.word_count);
        println!("characters:          {}", stats.character_count);
        println!("characters (no ws):  {}", stats.characters_no_spaces);
        println!("lines:               {}", stats.line_count);
        println!("sentences:           {}", stats.sentence_count);
        println!("reading time:        {:.1} min", stats.reading_time_minutes);
        return ExitCode::SUCCESS;
    }

    let title = args.title.unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let (created_at, modified_at) = file_timestamps(&args.input);
    let doc = Document {
        title,
        body,
        language: args.language,
        created_at,
        modified_at,
    };
    let opts = FormattingOptions {
        font_family: args.font_family,
        font_size: args.font_size,
        line_spacing: args.line_spacing,
        alignment: args.align.into(),
        text_color: [0, 0, 0],
    };

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("pdf"));
    match textpage_pdf::export_to_file(&doc, &opts, &output) {
        Ok(()) => {
            println!("wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
