//! One run: load the catalogs and site stores, resolve every request,
//! write the rewritten stores.

use crate::config::{JobConfig, RunConfig};
use anyhow::Context;
use diagmerge_engine::{Catalogs, Engine, SiteStores};
use diagmerge_store::{
    load_requests, IceFieldList, MappingCatalog, RoseConfig, StashMaster, SuiteLayout, XmlTree,
};
use diagmerge_types::{RunSummary, StashId};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the three site stores of a job are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub atmosphere: PathBuf,
    pub ocean_request: PathBuf,
    pub ice: PathBuf,
}

impl StorePaths {
    /// Explicit paths from the job win over the suite layout.
    pub fn locate(job: &JobConfig, layout: &SuiteLayout) -> anyhow::Result<Self> {
        let atmosphere = job
            .atmosphere_store
            .clone()
            .unwrap_or_else(|| layout.atmosphere_store(job.flavor));
        let ice = job.ice_store.clone().unwrap_or_else(|| layout.ice_store());
        let ocean_request = match &job.ocean_request {
            Some(path) => path.clone(),
            None => {
                let app_path = job.ocean_store.clone().unwrap_or_else(|| layout.ocean_app());
                let app = RoseConfig::load(&app_path)?;
                layout.ocean_request(&app)?
            }
        };
        Ok(Self {
            atmosphere,
            ocean_request,
            ice,
        })
    }
}

/// What a finished run did.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub added_codes: Vec<StashId>,
    pub written: Vec<PathBuf>,
}

pub fn load_catalogs(config: &RunConfig) -> anyhow::Result<Catalogs> {
    let paths = &config.catalogs;
    let catalogs = Catalogs {
        mappings: MappingCatalog::load(&paths.mappings)?,
        reference: RoseConfig::load(&paths.reference)?,
        stashmaster: StashMaster::load(&paths.stashmaster)?,
        ocean_fields: XmlTree::load(&paths.ocean_field_def)?,
        ice_fields: IceFieldList::load(&paths.ice_diagnostics)?,
    };
    info!(
        mappings = catalogs.mappings.len(),
        stash_codes = catalogs.stashmaster.len(),
        ice_fields = catalogs.ice_fields.len(),
        "catalogs loaded"
    );
    Ok(catalogs)
}

/// Runs the job. Resolution errors come back as `ResolveError` inside the
/// `anyhow::Error`; nothing is written when one occurs.
pub fn execute(config: &RunConfig) -> anyhow::Result<RunReport> {
    let layout = SuiteLayout::new(&config.job.path);
    let paths = StorePaths::locate(&config.job, &layout)?;
    let catalogs = load_catalogs(config)?;
    let policy = config.policy();

    let requests = load_requests(&config.job.requests)?;
    info!(requests = requests.len(), flavor = %config.job.flavor, "requests loaded");

    let stores = SiteStores {
        atmosphere: RoseConfig::load(&paths.atmosphere)?,
        ocean: XmlTree::load(&paths.ocean_request)?,
        ice: RoseConfig::load(&paths.ice)?,
    };

    let mut engine = Engine::new(&catalogs, &policy, stores);
    engine.run(&requests)?;
    let output = engine.finish();

    let out_dir = &config.job.output_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let written = vec![
        write_store(out_dir, &layout, &paths.atmosphere, &output.stores.atmosphere.render())?,
        write_store(out_dir, &layout, &paths.ocean_request, &output.stores.ocean.render())?,
        write_store(out_dir, &layout, &paths.ice, &output.stores.ice.render())?,
    ];

    Ok(RunReport {
        summary: output.summary,
        added_codes: output.added_codes,
        written,
    })
}

fn write_store(out_dir: &Path, layout: &SuiteLayout, source: &Path, text: &str) -> anyhow::Result<PathBuf> {
    let target = out_dir.join(layout.output_name(source));
    fs::write(&target, text).with_context(|| format!("writing {}", target.display()))?;
    info!(source = %source.display(), target = %target.display(), "store written");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagmerge_types::{ResolveError, StashFlavor, Subsystem};

    const UM_APP: &str = "\
[namelist:umstash_domain(diag_11111111)]
dom_name='DIAG'
iopl=5
plt=0

[namelist:umstash_time(tmonmn_33333333)]
ifre=30
ityp=3
tim_name='TMONMN'
unt1=3
unt2=1
unt3=3

[namelist:umstash_use(upm_44444444)]
file_id='pp_upm'
use_name='UPM'
";

    const XML_APP: &str = "\
[file:iodef_nemo.xml]
source=$NEMO_DIR/iodef_nemo.xml
";

    const IODEF: &str = r#"<context id="nemo">
  <file_definition>
    <file_group id="1m" output_freq="1mo">
      <file id="file1" name_suffix="_grid_T">
        <field field_ref="sst" name="tos"/>
      </file>
    </file_group>
  </file_definition>
</context>
"#;

    const ICE_APP: &str = "\
[namelist:icefields_nml]
f_aice='m'

[namelist:setup_nml]
histfreq='m','x','x','x','x'
histfreq_n=1,1,1,1,1
";

    const MAPPINGS: &str = "\
[tas]
expression = m01s03i236
";

    const STASHMASTER: &str = "\
1|    1 |    3 |  236 |TEMPERATURE AT 1.5M                 |
2|    1 |    0 |    1 |    1 |    5 |   -1 |   -1 |    0 |    0 |    0 |    0 |
";

    const ICE_SOURCE: &str = "\
      namelist / icefields_nml / &
           f_aice, f_hi
";

    const FIELD_DEF: &str = r#"<field_definition>
  <field_group id="grid_T" grid_ref="grid_T_2D">
    <field id="sst"/>
  </field_group>
</field_definition>
"#;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn job(dir: &Path, requests: &str) -> RunConfig {
        let suite = dir.join("u-ab123");
        write(&suite.join("app/um/rose-app.conf"), UM_APP);
        write(&suite.join("app/xml/rose-app.conf"), XML_APP);
        write(&suite.join("app/xml/file/iodef_nemo.xml"), IODEF);
        write(&suite.join("app/nemo_cice/rose-app.conf"), ICE_APP);

        let catalogs = dir.join("catalogs");
        write(&catalogs.join("mappings.cfg"), MAPPINGS);
        write(&catalogs.join("reference.conf"), "");
        write(&catalogs.join("STASHmaster_A"), STASHMASTER);
        write(&catalogs.join("field_def.xml"), FIELD_DEF);
        write(&catalogs.join("ice_history_shared.F90"), ICE_SOURCE);
        write(&dir.join("requests.csv"), requests);

        let mut config = RunConfig::default();
        config.catalogs.mappings = vec![catalogs.join("mappings.cfg")];
        config.catalogs.reference = catalogs.join("reference.conf");
        config.catalogs.stashmaster = catalogs.join("STASHmaster_A");
        config.catalogs.ocean_field_def = catalogs.join("field_def.xml");
        config.catalogs.ice_diagnostics = catalogs.join("ice_history_shared.F90");
        config.job.path = suite;
        config.job.requests = dir.join("requests.csv");
        config.job.flavor = StashFlavor::Um;
        config.job.output_dir = dir.join("out");
        config
    }

    #[test]
    fn test_store_paths_follow_the_suite() {
        let dir = tempfile::tempdir().unwrap();
        let config = job(dir.path(), "variable,time,space,realm\n");
        let layout = SuiteLayout::new(&config.job.path);
        let paths = StorePaths::locate(&config.job, &layout).unwrap();
        assert!(paths.atmosphere.ends_with("app/um/rose-app.conf"));
        assert!(paths.ocean_request.ends_with("app/xml/file/iodef_nemo.xml"));
        assert!(paths.ice.ends_with("app/nemo_cice/rose-app.conf"));
    }

    #[test]
    fn test_run_writes_flattened_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = job(
            dir.path(),
            "variable,time,space,realm\n\
             tas,mon,longitude latitude time,atmos\n\
             aice,day,longitude latitude time,seaIce\n",
        );
        let report = execute(&config).unwrap();

        assert_eq!(report.summary.added(Subsystem::Atmosphere), vec!["m01s03i236"]);
        assert_eq!(report.summary.added(Subsystem::Ice), vec!["f_aice"]);
        assert_eq!(report.written.len(), 3);

        let out = dir.path().join("out");
        let um = fs::read_to_string(out.join("u-ab123__app__um__rose-app.conf")).unwrap();
        assert!(um.contains("namelist:umstash_streq(03236_"));
        let ice = fs::read_to_string(out.join("u-ab123__app__nemo_cice__rose-app.conf")).unwrap();
        assert!(ice.contains("f_aice='md'"));
        assert!(out.join("u-ab123__app__xml__file__iodef_nemo.xml").exists());
    }

    #[test]
    fn test_fatal_resolution_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = job(
            dir.path(),
            "variable,time,space,realm\ntas,day,longitude latitude time,atmos\n",
        );
        let err = execute(&config).unwrap_err();
        assert!(err.downcast_ref::<ResolveError>().is_some());
        assert!(!dir.path().join("out").exists());
    }
}
