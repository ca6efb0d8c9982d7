//! Measurement Folder Fixtures
//!
//! Builds synthetic console output: folder name, `Check.xml`, exports and the
//! detector image triple.

use std::path::{Path, PathBuf};

use mpcp_etl::models::image_record::{DARK_IMAGE_FILE, FLOOD_IMAGE_FILE, PROFILE_IMAGE_FILE};

pub const SCENARIO_A_FOLDER: &str = "NDS-WKS-SN6543-2025-09-19-07-41-49-0004-BeamCheckTemplate6e";
pub const SCENARIO_B_FOLDER: &str =
    "NDS-WKS-SN6543-2025-09-19-08-02-11-0007-GeometryCheckTemplate6xMVkVEnhancedCouch";

/// A measurement folder under construction
#[derive(Debug, Clone)]
pub struct MeasurementFolder {
    path: PathBuf,
}

impl MeasurementFolder {
    /// Create `root/name` with no files in it
    pub fn create(root: &Path, name: &str) -> Self {
        let path = root.join(name);
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `Check.xml` in the console's namespace
    pub fn with_marker(self, is_baseline: bool) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Check xmlns="http://www.varian.com/MPC" xmlns:i="http://www.w3.org/2001/XMLSchema-instance">
  <IsBaseline>{}</IsBaseline>
</Check>"#,
            is_baseline
        );
        self.write("Check.xml", xml.as_bytes())
    }

    /// Write `Results.csv` with the console's `Name [Unit], Value` header
    pub fn with_csv(self, rows: &[(&str, &str)]) -> Self {
        let mut csv = String::from("Name [Unit], Value\n");
        for (name, value) in rows {
            csv.push_str(&format!("{}, {}\n", name, value));
        }
        self.write("Results.csv", csv.as_bytes())
    }

    /// Write `Results.xml` with a beam-profile result and a couch reference
    pub fn with_results_xml(
        self,
        output: &str,
        uniformity: &str,
        center_shift: &str,
        couch: [&str; 4],
    ) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Results xmlns="http:/www.varian.com/MPC" xmlns:i="http://www.w3.org/2001/XMLSchema-instance">
  <ProcessingSteps>
    <CompletedSteps xmlns:d2p1="http://schemas.microsoft.com/2003/10/Serialization/Arrays">
      <d2p1:anyType i:type="BeamProfileCheck">
        <BeamCenterShift>{center_shift}</BeamCenterShift>
        <RelativeOutput>{output}</RelativeOutput>
        <RelativeUniformity>{uniformity}</RelativeUniformity>
      </d2p1:anyType>
    </CompletedSteps>
    <CouchReference>
      <CouchLat>{lat}</CouchLat>
      <CouchLng>{lng}</CouchLng>
      <CouchVrt>{vrt}</CouchVrt>
      <CouchRtn>{rtn}</CouchRtn>
    </CouchReference>
  </ProcessingSteps>
</Results>"#,
            lat = couch[0],
            lng = couch[1],
            vrt = couch[2],
            rtn = couch[3],
        );
        self.write("Results.xml", xml.as_bytes())
    }

    /// Write a `SetBeam-*.xml` with one linac control point
    pub fn with_set_beam(self, gantry: &str, jaws: [&str; 4], bank_a: &[&str]) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<SetBeam xmlns="http:/www.varian.com/MPC">
  <ControlPoints>
    <Cp>
      <WorkObjectID>Linac</WorkObjectID>
      <GantryRtn>{gantry}</GantryRtn>
      <CollRtn>0.0</CollRtn>
      <X1>{x1}</X1><X2>{x2}</X2><Y1>{y1}</Y1><Y2>{y2}</Y2>
      <Mlc><A>{a}</A><B></B></Mlc>
    </Cp>
  </ControlPoints>
</SetBeam>"#,
            x1 = jaws[0],
            x2 = jaws[1],
            y1 = jaws[2],
            y2 = jaws[3],
            a = bank_a.join(" "),
        );
        self.write("SetBeam-Linac.xml", xml.as_bytes())
    }

    /// Write the clinical, dark and flood frames as uncompressed XIM files
    pub fn with_images(self, width: usize, height: usize, clinical: &[i32], dark: &[i32], flood: &[i32]) -> Self {
        self.write(PROFILE_IMAGE_FILE, &encode_xim(width, height, clinical))
            .write(DARK_IMAGE_FILE, &encode_xim(width, height, dark))
            .write(FLOOD_IMAGE_FILE, &encode_xim(width, height, flood))
    }

    pub fn write(self, file_name: &str, contents: &[u8]) -> Self {
        std::fs::write(self.path.join(file_name), contents).unwrap();
        self
    }

    pub fn remove(self, file_name: &str) -> Self {
        std::fs::remove_file(self.path.join(file_name)).unwrap();
        self
    }
}

/// Rows of a full geometry export, leaves 1..=60 on both banks
pub fn geometry_csv_rows() -> Vec<(String, String)> {
    let mut rows = vec![
        ("IsoCenterGroup/IsoCenterSize [mm]".to_string(), "0.31".to_string()),
        ("IsoCenterGroup/IsoCenterMVOffset [mm]".to_string(), "0.12".to_string()),
        ("IsoCenterGroup/IsoCenterKVOffset [mm]".to_string(), "0.25".to_string()),
        ("BeamGroup/BeamOutputChange [%]".to_string(), "0.45".to_string()),
        ("BeamGroup/BeamUniformityChange [%]".to_string(), "0.07".to_string()),
        ("BeamGroup/BeamCenterShift [mm]".to_string(), "0.18".to_string()),
        ("CollimationGroup/JawsGroup/JawX1 [mm]".to_string(), "0.4".to_string()),
        ("CollimationGroup/JawsGroup/JawParallelismX1 [°]".to_string(), "0.05".to_string()),
        ("CollimationGroup/MLCGroup/MaxOffsetA [mm]".to_string(), "0.6".to_string()),
        ("CouchGroup/CouchRtnFine [°]".to_string(), "0.02".to_string()),
    ];
    for i in 1..=60 {
        rows.push((
            format!("CollimationGroup/MLCGroup/MLCLeavesA/MLCLeaf{} [mm]", i),
            format!("{}.25", i),
        ));
        rows.push((
            format!("CollimationGroup/MLCBacklashGroup/MLCBacklashLeavesB/MLCBacklashLeaf{} [mm]", i),
            "0.1".to_string(),
        ));
    }
    rows
}

/// Constant frame
pub fn flat_frame(width: usize, height: usize, value: i32) -> Vec<i32> {
    vec![value; width * height]
}

/// Square field of `signal` in the middle half of the frame on a `background` floor
pub fn field_image(width: usize, height: usize, background: i32, signal: i32) -> Vec<i32> {
    let (x0, x1) = (width / 4, width * 3 / 4);
    let (y0, y1) = (height / 4, height * 3 / 4);
    (0..height)
        .flat_map(|y| {
            (0..width).map(move |x| {
                if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                    signal
                } else {
                    background
                }
            })
        })
        .collect()
}

/// Uncompressed XIM: identifier, six header words, buffer size, 4-byte pixels
fn encode_xim(width: usize, height: usize, pixels: &[i32]) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height, "pixel count does not match frame");
    let mut out = b"VMS.XI\0\0".to_vec();
    for word in [1, width as i32, height as i32, 32, 4, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&((pixels.len() * 4) as i32).to_le_bytes());
    for p in pixels {
        out.extend_from_slice(&p.to_le_bytes());
    }
    out
}
