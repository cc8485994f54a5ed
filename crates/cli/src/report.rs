//! Plain-stdout summaries. Everything else logs through tracing; the final
//! report is the one thing meant for eyes and scripts alike.

use shelfstream_pipeline::batch::{RunReport, ValidationReport};
use shelfstream_pipeline::convert::ConversionJob;

pub fn print_report(report: &RunReport) {
    let finished = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    println!("shelfstream run finished at {finished}");
    println!("  total:     {}", report.total);
    println!("  converted: {}", report.converted);
    println!("  partial:   {}", report.partial);
    println!("  skipped:   {}", report.skipped);
    println!("  failed:    {}", report.failed);
    if report.halted {
        println!("  scheduling halted early: critically low disk space");
    }
    if !report.errors.is_empty() {
        println!("errors:");
        for line in &report.errors {
            println!("  {line}");
        }
    }
}

pub fn print_plan(jobs: &[ConversionJob]) {
    println!("planned conversions ({} videos):", jobs.len());
    for job in jobs {
        let qualities: Vec<&str> = job.tasks.iter().map(|t| t.profile.name).collect();
        println!(
            "  {} -> {} [{}]",
            job.video.path.display(),
            job.output_dir.display(),
            qualities.join(", ")
        );
    }
}

pub fn print_validation(results: &[ValidationReport]) {
    println!("validation ({} videos):", results.len());
    for r in results {
        let state = if !r.output_exists {
            "no output"
        } else if r.aligned {
            "aligned"
        } else {
            "misaligned"
        };
        println!("  {}: {state}", r.video.display());
        for track in &r.tracks {
            println!(
                "    {}: {:.1}s over {} segments",
                track.name, track.duration_secs, track.segment_count
            );
        }
    }
}
