use crate::domain::event::Availability;
use crate::error::Result;
use std::io::Write;

/// Writes per-category availability snapshots as CSV.
pub struct SnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(sink),
        }
    }

    pub fn write_snapshots(&mut self, snapshots: Vec<Availability>) -> Result<()> {
        self.writer.write_record([
            "event",
            "category",
            "total",
            "locked",
            "sold",
            "remaining",
            "status",
        ])?;
        for snapshot in snapshots {
            self.writer.write_record([
                snapshot.event_id.to_string(),
                snapshot.category_id.to_string(),
                snapshot.total_seats.to_string(),
                snapshot.locked_seats.to_string(),
                snapshot.seats_sold.to_string(),
                snapshot.remaining.to_string(),
                snapshot.status.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
