/*!
# Exporting Estimates to CSV

Writes the statistic behind a chart as a plain table so it can be inspected or re-plotted
elsewhere. Enable via the `csv` feature.

The layout depends on the estimator:

| result                | header                                   |
|-----------------------|------------------------------------------|
| (boolean) histogram   | `bin_start,bin_end,density`              |
| 2-D histogram         | `x_start,x_end,y_start,y_end,mass`       |
| occupancy matrix      | `state,iteration,occupancy`              |
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::error::{Result, VizError};
use crate::stats::EstimatorResult;

/**
Saves an estimator result as a CSV file.

# Arguments

* `result` - The statistic of one dataset.
* `path` - The file path where the CSV data will be written.

# Examples

```rust
use infer_viz::io::csv::save_estimate_csv;
use infer_viz::stats::{weighted_bool_histogram, EstimatorResult};
use ndarray::array;

let hist = weighted_bool_histogram(&[true, false, true, true], array![0.25, 0.25, 0.25, 0.25].view());
save_estimate_csv(&EstimatorResult::BooleanHistogram(hist), "/tmp/coin.csv")?;
# Ok::<(), infer_viz::error::VizError>(())
```
*/
pub fn save_estimate_csv(result: &EstimatorResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| VizError::io(path, e))?;
    let mut wtr = Writer::from_writer(file);
    let csv_err = |e: csv::Error| VizError::Render(format!("{}: {e}", path.display()));

    match result {
        EstimatorResult::Histogram(hist) | EstimatorResult::BooleanHistogram(hist) => {
            wtr.write_record(["bin_start", "bin_end", "density"])
                .map_err(csv_err)?;
            for (i, d) in hist.densities.iter().enumerate() {
                let row = [hist.edges[i], hist.edges[i + 1], *d];
                wtr.write_record(row.iter().map(|v| v.to_string()))
                    .map_err(csv_err)?;
            }
        }
        EstimatorResult::Histogram2D(hist) => {
            wtr.write_record(["x_start", "x_end", "y_start", "y_end", "mass"])
                .map_err(csv_err)?;
            for ((i, j), m) in hist.mass.indexed_iter() {
                let row = [
                    hist.x_edges[i],
                    hist.x_edges[i + 1],
                    hist.y_edges[j],
                    hist.y_edges[j + 1],
                    *m,
                ];
                wtr.write_record(row.iter().map(|v| v.to_string()))
                    .map_err(csv_err)?;
            }
        }
        EstimatorResult::Occupancy(occ) => {
            wtr.write_record(["state", "iteration", "occupancy"])
                .map_err(csv_err)?;
            for ((s, t), p) in occ.occupancy.indexed_iter() {
                wtr.write_record([s.to_string(), t.to_string(), p.to_string()])
                    .map_err(csv_err)?;
            }
        }
    }

    wtr.flush().map_err(|e| VizError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{occupancy_matrix, weighted_bool_histogram, OccupancyMatrix};
    use csv::Reader;
    use ndarray::array;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_bool_histogram() {
        let hist = weighted_bool_histogram(&[true, false], array![0.75, 0.25].view());
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_estimate_csv(&EstimatorResult::BooleanHistogram(hist), file.path()).unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        let expected = "\
bin_start,bin_end,density
0,1,0.25
1,2,0.75";
        assert_eq!(contents.trim(), expected);
    }

    #[test]
    fn test_save_occupancy() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let occ = occupancy_matrix(array![[0, 1], [1, 1]].view(), array![0.5, 0.5].view())?;
        let file = NamedTempFile::new()?;
        save_estimate_csv(&EstimatorResult::Occupancy(occ), file.path())?;

        let mut rdr = Reader::from_path(file.path())?;
        let headers = rdr.headers()?.clone();
        assert_eq!(&headers[0], "state");
        assert_eq!(&headers[2], "occupancy");
        let records: Vec<_> = rdr.records().collect::<std::result::Result<_, _>>()?;
        // 2 states * 2 iterations
        assert_eq!(records.len(), 4);
        assert_eq!(&records[3][2], "1");
        Ok(())
    }

    #[test]
    fn test_empty_occupancy_writes_header_only() {
        let occ = OccupancyMatrix {
            occupancy: ndarray::Array2::zeros((0, 0)),
        };
        let file = NamedTempFile::new().unwrap();
        save_estimate_csv(&EstimatorResult::Occupancy(occ), file.path()).unwrap();
        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents.trim(), "state,iteration,occupancy");
    }
}
