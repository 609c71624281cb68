#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!(
        "subd_cli requires the `cli` feature.\n\
         Example: cargo run -p subd-engine --bin subd_cli --features cli -- list"
    );
    std::process::exit(1);
}

#[cfg(feature = "cli")]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("subd_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
mod native {
    use std::fmt::Write as _;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::path::{Path, PathBuf};

    use subd_engine::geom::{
        CurveRefineDiagnostics, CurveRefineOptions, GeomMesh, GeomMeshDiagnostics,
        LoopSubdivisionDiagnostics, LoopSubdivisionOptions, loop_subdivide, try_refine_curve,
    };

    const SNAPSHOT_QUANTIZE: f64 = 1e-6;
    const SNAPSHOT_DECIMALS: usize = 6;

    const DEFAULT_MESH_ITERATIONS: usize = 2;
    const DEFAULT_CURVE_ITERATIONS: usize = 3;

    const USAGE: &str = r#"subd_cli (subd-engine)

USAGE:
  subd_cli list
  subd_cli run <scenario|all> [options]

SCENARIOS:
  triangle_loop
  quad_loop
  tetrahedron_loop
  octahedron_loop
  square_chaikin_closed
  polyline_chaikin_open

OPTIONS (run):
  --iterations <n>     Refinement passes (meshes default to 2, curves to 3)
  --out-dir <dir>      Write <scenario>.obj and/or <scenario>.snap to this dir (required for `all`)
  --obj <path>         Write OBJ (single scenario only)
  --snap <path>        Write golden-style snapshot (single scenario only)
  --no-obj             Skip OBJ when using --out-dir
  --no-snap            Skip snapshot when using --out-dir
  --overwrite          Overwrite existing output files
  --log-level <level>  Log filter, e.g. `debug` or `subd_engine=trace` (default: info, or RUST_LOG)
  -h, --help           Show this help
"#;

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "list" => {
                print_scenarios();
                Ok(())
            }
            "run" => cmd_run(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn print_scenarios() {
        for scenario in Scenario::ALL {
            println!("{}", scenario.name());
        }
    }

    fn init_logger(level: Option<&str>) {
        let mut builder = env_logger::Builder::new();
        builder.target(env_logger::Target::Stderr);
        builder.filter_level(log::LevelFilter::Info);
        match level {
            Some(level) => {
                builder.parse_filters(level);
            }
            None => {
                if let Ok(env) = std::env::var("RUST_LOG") {
                    builder.parse_filters(&env);
                }
            }
        }
        builder.format(|buf, record| {
            let module = record.module_path().unwrap_or(record.target());
            writeln!(buf, "[{}] {}: {}", record.level(), module, record.args())
        });

        if let Err(err) = builder.try_init() {
            eprintln!("failed to initialize logger: {err}");
        }
    }

    fn cmd_run(args: &mut Args) -> Result<(), String> {
        let scenario_name = args.next().ok_or("missing scenario name")?;

        let mut out_dir: Option<PathBuf> = None;
        let mut obj_path: Option<PathBuf> = None;
        let mut snap_path: Option<PathBuf> = None;
        let mut overwrite = false;
        let mut write_obj = true;
        let mut write_snap = true;
        let mut iterations: Option<usize> = None;
        let mut log_level: Option<String> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--out-dir" => out_dir = Some(PathBuf::from(args.value("--out-dir")?)),
                "--obj" => obj_path = Some(PathBuf::from(args.value("--obj")?)),
                "--snap" => snap_path = Some(PathBuf::from(args.value("--snap")?)),
                "--iterations" => {
                    let raw = args.value("--iterations")?;
                    let n = raw
                        .parse::<usize>()
                        .map_err(|e| format!("invalid --iterations `{raw}`: {e}"))?;
                    iterations = Some(n);
                }
                "--log-level" => log_level = Some(args.value("--log-level")?),
                "--overwrite" => overwrite = true,
                "--no-obj" => write_obj = false,
                "--no-snap" => write_snap = false,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        init_logger(log_level.as_deref());

        if let Some(dir) = out_dir.as_ref() {
            if obj_path.is_some() || snap_path.is_some() {
                return Err("use either --out-dir or --obj/--snap (not both)".to_string());
            }
            if !write_obj && !write_snap {
                return Err("nothing to write (both --no-obj and --no-snap set)".to_string());
            }

            fs::create_dir_all(dir).map_err(|e| format!("create out dir: {e}"))?;

            if scenario_name == "all" {
                for scenario in Scenario::ALL {
                    run_one_scenario_to_dir(*scenario, iterations, dir, write_obj, write_snap, overwrite)?;
                }
                return Ok(());
            }

            let scenario = Scenario::by_name(scenario_name.as_str())
                .ok_or_else(|| unknown_scenario(&scenario_name))?;
            return run_one_scenario_to_dir(scenario, iterations, dir, write_obj, write_snap, overwrite);
        }

        if scenario_name == "all" {
            return Err("`run all` requires --out-dir".to_string());
        }

        let scenario =
            Scenario::by_name(scenario_name.as_str()).ok_or_else(|| unknown_scenario(&scenario_name))?;
        let output = run_scenario(scenario, iterations)?;

        if let Some(path) = snap_path.as_deref() {
            write_text_file(path, &output.snapshot, overwrite)?;
            log::info!("wrote {}", path.display());
        } else {
            print!("{}", output.snapshot);
        }

        if let Some(path) = obj_path.as_deref() {
            write_obj_file(path, &output.geometry, output.name, overwrite)?;
            log::info!("wrote {}", path.display());
        }

        log::info!("{}: {}", output.name, output.summary);
        Ok(())
    }

    fn run_one_scenario_to_dir(
        scenario: Scenario,
        iterations: Option<usize>,
        dir: &Path,
        write_obj: bool,
        write_snap: bool,
        overwrite: bool,
    ) -> Result<(), String> {
        let output = run_scenario(scenario, iterations)?;

        if write_snap {
            let path = dir.join(format!("{}.snap", output.name));
            write_text_file(&path, &output.snapshot, overwrite)?;
            log::info!("wrote {}", path.display());
        }

        if write_obj {
            let path = dir.join(format!("{}.obj", output.name));
            write_obj_file(&path, &output.geometry, output.name, overwrite)?;
            log::info!("wrote {}", path.display());
        }

        log::info!("{}: {}", output.name, output.summary);
        Ok(())
    }

    fn unknown_scenario(name: &str) -> String {
        let mut msg = String::new();
        let _ = write!(msg, "unknown scenario `{name}`\n\navailable scenarios:\n");
        for scenario in Scenario::ALL {
            let _ = writeln!(msg, "  {}", scenario.name());
        }
        msg
    }

    fn refuse_overwrite(path: &Path, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        Ok(())
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        refuse_overwrite(path, overwrite)?;
        fs::write(path, normalize_snapshot_text(text)).map_err(|e| format!("write {}: {e}", path.display()))
    }

    fn write_obj_file(path: &Path, geometry: &Geometry, name: &str, overwrite: bool) -> Result<(), String> {
        if let Geometry::Mesh(mesh) = geometry {
            mesh.validate().map_err(|e| format!("mesh validation failed: {e}"))?;
        }
        refuse_overwrite(path, overwrite)?;

        let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
        let mut w = BufWriter::new(file);

        writeln!(w, "# subd-engine subd_cli").map_err(|e| format!("write obj: {e}"))?;
        writeln!(w, "o {name}").map_err(|e| format!("write obj: {e}"))?;

        let written = match geometry {
            Geometry::Mesh(mesh) => write_obj_mesh(&mut w, mesh),
            Geometry::Curve { points, closed } => write_obj_polyline(&mut w, points, *closed),
        };
        written.map_err(|e| format!("write obj: {e}"))?;

        w.flush().map_err(|e| format!("flush {}: {e}", path.display()))
    }

    fn write_obj_mesh(w: &mut impl Write, mesh: &GeomMesh) -> std::io::Result<()> {
        for p in mesh.positions.iter().copied() {
            writeln!(w, "v {} {} {}", p[0], p[1], p[2])?;
        }

        if let Some(uvs) = mesh.uvs.as_ref() {
            for uv in uvs.iter().copied() {
                writeln!(w, "vt {} {}", uv[0], uv[1])?;
            }
        }

        if let Some(normals) = mesh.normals.as_ref() {
            for n in normals.iter().copied() {
                writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
            }
        }

        let has_uvs = mesh.uvs.is_some();
        let has_normals = mesh.normals.is_some();

        for [a, b, c] in mesh.triangles() {
            let (a, b, c) = (a + 1, b + 1, c + 1);
            match (has_uvs, has_normals) {
                (true, true) => writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?,
                (true, false) => writeln!(w, "f {a}/{a} {b}/{b} {c}/{c}")?,
                (false, true) => writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}")?,
                (false, false) => writeln!(w, "f {a} {b} {c}")?,
            }
        }
        Ok(())
    }

    fn write_obj_polyline(w: &mut impl Write, points: &[[f64; 3]], closed: bool) -> std::io::Result<()> {
        for p in points {
            writeln!(w, "v {} {} {}", p[0], p[1], p[2])?;
        }
        if points.len() < 2 {
            return Ok(());
        }

        write!(w, "l")?;
        for i in 1..=points.len() {
            write!(w, " {i}")?;
        }
        if closed {
            write!(w, " 1")?;
        }
        writeln!(w)
    }

    fn normalize_snapshot_text(text: &str) -> String {
        let normalized = text.replace("\r\n", "\n");
        if normalized.ends_with('\n') {
            normalized
        } else {
            format!("{normalized}\n")
        }
    }

    fn quantize_f64(value: f64) -> f64 {
        if !value.is_finite() {
            return value;
        }
        let value = if value == -0.0 { 0.0 } else { value };
        let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
        if q == -0.0 { 0.0 } else { q }
    }

    fn write_f64(out: &mut String, value: f64) {
        let value = quantize_f64(value);
        let _ = write!(out, "{value:.SNAPSHOT_DECIMALS$}");
    }

    fn write_f64_line(out: &mut String, key: &str, value: f64) {
        let _ = write!(out, "{key} ");
        write_f64(out, value);
        out.push('\n');
    }

    fn write_vec3_line(out: &mut String, prefix: &str, v: [f64; 3]) {
        let _ = write!(out, "{prefix} ");
        write_f64(out, v[0]);
        out.push(' ');
        write_f64(out, v[1]);
        out.push(' ');
        write_f64(out, v[2]);
        out.push('\n');
    }

    fn write_vec2_line(out: &mut String, prefix: &str, v: [f64; 2]) {
        let _ = write!(out, "{prefix} ");
        write_f64(out, v[0]);
        out.push(' ');
        write_f64(out, v[1]);
        out.push('\n');
    }

    fn write_warnings(out: &mut String, prefix: &str, warnings: &[String]) {
        let _ = writeln!(out, "{prefix}.warning_count {}", warnings.len());
        for (idx, warning) in warnings.iter().enumerate() {
            let _ = writeln!(out, "{prefix}.warning.{idx} {warning}");
        }
    }

    fn write_geom_mesh_diagnostics(out: &mut String, diag: &GeomMeshDiagnostics) {
        let _ = writeln!(out, "mesh_diag.vertex_count {}", diag.vertex_count);
        let _ = writeln!(out, "mesh_diag.triangle_count {}", diag.triangle_count);
        let _ = writeln!(out, "mesh_diag.edge_count {}", diag.edge_count);
        let _ = writeln!(out, "mesh_diag.welded_vertex_count {}", diag.welded_vertex_count);
        let _ = writeln!(
            out,
            "mesh_diag.degenerate_triangle_count {}",
            diag.degenerate_triangle_count
        );
        let _ = writeln!(out, "mesh_diag.open_edge_count {}", diag.open_edge_count);
        let _ = writeln!(
            out,
            "mesh_diag.non_manifold_edge_count {}",
            diag.non_manifold_edge_count
        );
        if let Some(format) = diag.index_format {
            let _ = writeln!(out, "mesh_diag.index_format {format:?}");
        }
        write_warnings(out, "mesh_diag", &diag.warnings);
    }

    fn write_subdivision_diagnostics(out: &mut String, diag: &LoopSubdivisionDiagnostics) {
        let _ = writeln!(out, "subd_diag.input_vertex_count {}", diag.input_vertex_count);
        let _ = writeln!(out, "subd_diag.input_triangle_count {}", diag.input_triangle_count);
        let _ = writeln!(out, "subd_diag.output_vertex_count {}", diag.output_vertex_count);
        let _ = writeln!(out, "subd_diag.output_triangle_count {}", diag.output_triangle_count);
        let _ = writeln!(out, "subd_diag.welded_vertex_count {}", diag.welded_vertex_count);
        let _ = writeln!(out, "subd_diag.iterations_applied {}", diag.iterations_applied);
        let _ = writeln!(out, "subd_diag.boundary_edge_count {}", diag.boundary_edge_count);
        let _ = writeln!(out, "subd_diag.interior_edge_count {}", diag.interior_edge_count);
        let _ = writeln!(
            out,
            "subd_diag.ignored_edge_registrations {}",
            diag.ignored_edge_registrations
        );
        let _ = writeln!(
            out,
            "subd_diag.low_valence_vertex_count {}",
            diag.low_valence_vertex_count
        );
        write_warnings(out, "subd_diag", &diag.warnings);
    }

    fn write_curve_diagnostics(out: &mut String, diag: &CurveRefineDiagnostics) {
        let _ = writeln!(out, "curve_diag.input_point_count {}", diag.input_point_count);
        let _ = writeln!(out, "curve_diag.output_point_count {}", diag.output_point_count);
        let _ = writeln!(out, "curve_diag.iterations_applied {}", diag.iterations_applied);
        let _ = writeln!(out, "curve_diag.closed {}", diag.closed);
        write_f64_line(out, "curve_diag.input_length", diag.input_length);
        write_f64_line(out, "curve_diag.output_length", diag.output_length);
        write_f64_line(out, "curve_diag.max_displacement", diag.max_displacement);
        write_warnings(out, "curve_diag", &diag.warnings);
    }

    fn write_mesh(out: &mut String, mesh: &GeomMesh) {
        let _ = writeln!(out, "mesh.vertex_count {}", mesh.vertex_count());
        let _ = writeln!(out, "mesh.triangle_count {}", mesh.triangle_count());
        let _ = writeln!(out, "mesh.has_uvs {}", mesh.uvs.is_some());
        let _ = writeln!(out, "mesh.has_normals {}", mesh.normals.is_some());

        let _ = writeln!(out, "mesh.positions {}", mesh.positions.len());
        for p in mesh.positions.iter().copied() {
            write_vec3_line(out, "p", p);
        }

        let _ = writeln!(out, "mesh.indices {}", mesh.triangle_count());
        for [a, b, c] in mesh.triangles() {
            let _ = writeln!(out, "i {a} {b} {c}");
        }

        if let Some(uvs) = mesh.uvs.as_ref() {
            let _ = writeln!(out, "mesh.uvs {}", uvs.len());
            for uv in uvs.iter().copied() {
                write_vec2_line(out, "uv", uv);
            }
        } else {
            let _ = writeln!(out, "mesh.uvs none");
        }

        if let Some(normals) = mesh.normals.as_ref() {
            let _ = writeln!(out, "mesh.normals {}", normals.len());
            for n in normals.iter().copied() {
                write_vec3_line(out, "n", n);
            }
        } else {
            let _ = writeln!(out, "mesh.normals none");
        }
    }

    fn write_curve(out: &mut String, points: &[[f64; 3]]) {
        let _ = writeln!(out, "curve.points {}", points.len());
        for p in points.iter().copied() {
            write_vec3_line(out, "p", p);
        }
    }

    fn snapshot(op: &str, sections: impl FnOnce(&mut String)) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# subd-engine golden v1");
        let _ = writeln!(out, "op {op}");
        let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
        sections(&mut out);
        normalize_snapshot_text(&out)
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Scenario {
        TriangleLoop,
        QuadLoop,
        TetrahedronLoop,
        OctahedronLoop,
        SquareChaikinClosed,
        PolylineChaikinOpen,
    }

    impl Scenario {
        const ALL: &'static [Scenario] = &[
            Scenario::TriangleLoop,
            Scenario::QuadLoop,
            Scenario::TetrahedronLoop,
            Scenario::OctahedronLoop,
            Scenario::SquareChaikinClosed,
            Scenario::PolylineChaikinOpen,
        ];

        fn name(self) -> &'static str {
            match self {
                Scenario::TriangleLoop => "triangle_loop",
                Scenario::QuadLoop => "quad_loop",
                Scenario::TetrahedronLoop => "tetrahedron_loop",
                Scenario::OctahedronLoop => "octahedron_loop",
                Scenario::SquareChaikinClosed => "square_chaikin_closed",
                Scenario::PolylineChaikinOpen => "polyline_chaikin_open",
            }
        }

        fn by_name(name: &str) -> Option<Self> {
            Scenario::ALL.iter().copied().find(|s| s.name() == name)
        }
    }

    enum Geometry {
        Mesh(GeomMesh),
        Curve { points: Vec<[f64; 3]>, closed: bool },
    }

    struct ScenarioOutput {
        name: &'static str,
        geometry: Geometry,
        summary: String,
        snapshot: String,
    }

    fn run_scenario(scenario: Scenario, iterations: Option<usize>) -> Result<ScenarioOutput, String> {
        let mesh_iterations = iterations.unwrap_or(DEFAULT_MESH_ITERATIONS);
        let curve_iterations = iterations.unwrap_or(DEFAULT_CURVE_ITERATIONS);
        let name = scenario.name();

        match scenario {
            Scenario::TriangleLoop => mesh_scenario(name, triangle(), mesh_iterations),
            Scenario::QuadLoop => mesh_scenario(name, quad_with_uvs(), mesh_iterations),
            Scenario::TetrahedronLoop => mesh_scenario(name, tetrahedron(), mesh_iterations),
            Scenario::OctahedronLoop => mesh_scenario(name, octahedron(), mesh_iterations),
            Scenario::SquareChaikinClosed => curve_scenario(
                name,
                &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
                CurveRefineOptions::new(curve_iterations, true),
            ),
            Scenario::PolylineChaikinOpen => curve_scenario(
                name,
                &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 2.0, 0.0], [4.0, 2.0, 1.0]],
                CurveRefineOptions::new(curve_iterations, false),
            ),
        }
    }

    fn mesh_scenario(name: &'static str, input: GeomMesh, iterations: usize) -> Result<ScenarioOutput, String> {
        let (mesh, diag) =
            loop_subdivide(&input, LoopSubdivisionOptions::new(iterations)).map_err(|e| e.to_string())?;
        let mesh_diag = diag.to_mesh_diagnostics(&mesh);

        let snap = snapshot(name, |out| {
            let _ = writeln!(out, "iterations {iterations}");
            write_subdivision_diagnostics(out, &diag);
            write_geom_mesh_diagnostics(out, &mesh_diag);
            write_mesh(out, &mesh);
        });

        Ok(ScenarioOutput {
            name,
            geometry: Geometry::Mesh(mesh),
            summary: mesh_diag.summary(),
            snapshot: snap,
        })
    }

    fn curve_scenario(
        name: &'static str,
        input: &[[f64; 3]],
        options: CurveRefineOptions,
    ) -> Result<ScenarioOutput, String> {
        let (points, diag) = try_refine_curve(input, options).map_err(|e| e.to_string())?;

        let snap = snapshot(name, |out| {
            let _ = writeln!(out, "iterations {}", options.iterations);
            write_curve_diagnostics(out, &diag);
            write_curve(out, &points);
        });

        let summary = format!(
            "points:{} -> {} length:{:.6} -> {:.6} displacement:{:.3e}",
            diag.input_point_count,
            diag.output_point_count,
            diag.input_length,
            diag.output_length,
            diag.max_displacement
        );

        Ok(ScenarioOutput {
            name,
            geometry: Geometry::Curve { points, closed: options.closed },
            summary,
            snapshot: snap,
        })
    }

    fn triangle() -> GeomMesh {
        GeomMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        )
    }

    // Split corners on purpose so the weld step has work to do.
    fn quad_with_uvs() -> GeomMesh {
        GeomMesh::with_uvs(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![0, 1, 2, 3, 4, 5],
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        )
    }

    fn tetrahedron() -> GeomMesh {
        GeomMesh::new(
            vec![
                [1.0, 1.0, 1.0],
                [1.0, -1.0, -1.0],
                [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
            ],
            vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2],
        )
    }

    fn octahedron() -> GeomMesh {
        GeomMesh::from_u16_indices(
            vec![
                [1.0, 0.0, 0.0],
                [-1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, -1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, -1.0],
            ],
            &[
                0, 2, 4, 2, 1, 4, 1, 3, 4, 3, 0, 4, //
                2, 0, 5, 1, 2, 5, 3, 1, 5, 0, 3, 5,
            ],
        )
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next()
                .ok_or_else(|| format!("missing value for {flag}"))
        }
    }

}
