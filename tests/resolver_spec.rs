use cask_checkpoint::locator::locate;
use cask_checkpoint::manifest::Manifest;
use cask_checkpoint::report::ContextSummary;
use cask_checkpoint::resolver::{resolve, Artifact};
use speculate2::speculate;

fn fixture(name: &str) -> Manifest {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let source = std::fs::read_to_string(&path).expect("Failed to read fixture");
    Manifest::parse(&source).expect("Failed to parse fixture")
}

fn versions(manifest: &Manifest) -> Vec<String> {
    resolve(manifest)
        .iter()
        .map(|c| c.version_value().map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

fn located_urls(manifest: &Manifest) -> Vec<Vec<String>> {
    let contexts = resolve(manifest);
    locate(&contexts)
        .iter()
        .map(|feed| feed.urls().into_iter().map(str::to_string).collect())
        .collect()
}

speculate! {
    describe "flat manifests" {
        it "produce exactly one context of root declarations" {
            let manifest = fixture("example-one.rb");
            let contexts = resolve(&manifest);
            assert_eq!(contexts.len(), 1);
            let context = &contexts[0];
            assert!(context.path.is_empty());
            assert_eq!(versions(&manifest), vec!["2.0.0"]);
            assert_eq!(context.name_values(), vec!["Example", "Example One"]);
            assert_eq!(context.artifacts.len(), 3);
            assert_eq!(
                context.sha256_value(),
                Some("f22abd6773ab232869321ad4b1e47ac0c908febf4f3a2bd10c8066140f741261")
            );
            assert!(context.checkpoint().is_none());
        }

        it "expose symbol versions by name" {
            let manifest = fixture("latest.rb");
            assert_eq!(versions(&manifest), vec!["latest"]);
            assert!(located_urls(&manifest).is_empty());
        }
    }

    describe "global applicability" {
        it "applies a global declared after the conditional to every branch" {
            let manifest = fixture("if-global-version-last.rb");
            assert_eq!(versions(&manifest), vec!["2.0.0", "2.0.0"]);
            let contexts = resolve(&manifest);
            assert_ne!(contexts[0].sha256_value(), contexts[1].sha256_value());
        }

        it "applies a global sha256 declared after the conditional" {
            let manifest = fixture("if-global-sha256-last.rb");
            let contexts = resolve(&manifest);
            assert_eq!(versions(&manifest), vec!["1.0.0", "2.0.0"]);
            for context in &contexts {
                assert_eq!(
                    context.sha256_value(),
                    Some("cd9d7b8c5d48e2d7f0673e0aa13e82e198f66e958d173d679e38a94abb1b2435")
                );
            }
        }

        it "applies a global declared before the conditional" {
            let manifest = fixture("if-global-version-two-sha256.rb");
            assert_eq!(versions(&manifest), vec!["2.0.0", "2.0.0"]);
            assert_eq!(
                located_urls(&manifest),
                vec![vec!["https://example.com/sparkle/2/appcast.xml"]]
            );
        }
    }

    describe "branch overrides" {
        it "keep each branch's own values" {
            let manifest = fixture("example-two.rb");
            let contexts = resolve(&manifest);
            assert_eq!(contexts.len(), 2);
            assert_eq!(contexts[0].label(), "if MacOS.release <= :el_capitan");
            assert_eq!(contexts[1].label(), "else");
            assert_eq!(versions(&manifest), vec!["1.5.0", "2.0.0"]);
            assert_eq!(
                contexts[0].checkpoint(),
                Some("93ef3101ca730028d70524f71b7f6f17cbdb8d26906299f90c38b7079e1d03a4")
            );
            assert_eq!(
                contexts[1].checkpoint(),
                Some("57956bd3fb23a5673e30dc83ed19d51b43e5a9235756887f3ed90662e6c68fb7")
            );
            assert_eq!(contexts[1].name_values(), vec!["Example", "Example Two"]);
            assert_eq!(contexts[0].constraints()[0].to_string(), "macOS <= OS X El Capitan (10.11)");
        }

        it "locate one statement per branch when every branch has its own appcast" {
            let manifest = fixture("if-six-versions-six-appcasts.rb");
            assert_eq!(resolve(&manifest).len(), 6);
            let urls = located_urls(&manifest);
            assert_eq!(urls.len(), 6);
            assert_eq!(urls[0], vec!["https://example.com/sparkle/0.1.0/snowleopard.xml"]);
            assert_eq!(urls[5], vec!["https://example.com/sparkle/2/appcast.xml"]);
        }

        it "skip branches without an appcast" {
            let manifest = fixture("if-three-versions-one-appcast.rb");
            let contexts = resolve(&manifest);
            assert_eq!(contexts.len(), 3);
            let feeds = locate(&contexts);
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].resolutions.len(), 1);
            assert_eq!(feeds[0].resolutions[0].label, "else");
        }

        it "repeat branch-local declarations without leaking into siblings" {
            let manifest = fixture("if-no-global.rb");
            let contexts = resolve(&manifest);
            assert_eq!(contexts[0].name_values(), vec!["Example", "Example (if-no-global)"]);
            assert_eq!(
                located_urls(&manifest),
                vec![
                    vec!["https://example.com/sparkle/1/mavericks.xml"],
                    vec!["https://example.com/sparkle/2/appcast.xml"],
                ]
            );
        }
    }

    describe "shared appcast statements" {
        it "are located once with one url per distinct interpolation" {
            let manifest = fixture("if-two-versions-one-global-appcast.rb");
            let contexts = resolve(&manifest);
            let feeds = locate(&contexts);
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].resolutions.len(), 2);
            assert_eq!(
                feeds[0].urls(),
                vec![
                    "https://example.com/sparkle/1/appcast.xml",
                    "https://example.com/sparkle/2/appcast.xml",
                ]
            );
            assert_eq!(
                feeds[0].existing_digest(),
                Some("8dc47a4bcec6e46b79fb6fc7b84224f1461f18a2d9f2e5adc94612bb9b97072d")
            );
        }
    }

    describe "sibling conditionals" {
        before {
            let manifest = Manifest::parse(
                "cask 'siblings' do\n  version '1.0'\n  if MacOS.release <= :yosemite\n    appcast 'https://e.com/old.xml'\n  end\n  if MacOS.release >= :mojave\n    url 'https://e.com/new.dmg'\n  else\n    url 'https://e.com/mid.dmg'\n  end\nend\n",
            )
            .expect("Failed to parse manifest");
            let contexts = resolve(&manifest);
        }

        it "contribute their own leaves without combining them" {
            let labels: Vec<String> = contexts.iter().map(|c| c.label()).collect();
            assert_eq!(
                labels,
                vec![
                    "if MacOS.release <= :yosemite",
                    "if MacOS.release >= :mojave",
                    "else",
                ]
            );
        }

        it "give an if without else no fall-through context" {
            assert!(contexts.iter().all(|c| !c.path.is_empty()));
            assert!(contexts[0].url.is_none());
        }

        it "keep a feed inside one conditional out of the other's contexts" {
            assert!(contexts[0].feed.is_some());
            assert!(contexts[1].feed.is_none());
            assert!(contexts[2].feed.is_none());
            let feeds = locate(&contexts);
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].resolutions.len(), 1);
            assert_eq!(feeds[0].resolutions[0].label, "if MacOS.release <= :yosemite");
        }
    }

    describe "resolved values" {
        it "expand url homepage and artifacts for a flat manifest" {
            let manifest = fixture("example-one.rb");
            let contexts = resolve(&manifest);
            let summary = ContextSummary::from(&contexts[0]);
            assert_eq!(summary.url.as_deref(), Some("https://example.com/app_2.0.0.dmg"));
            assert_eq!(summary.homepage.as_deref(), Some("https://example.com/"));
            assert_eq!(
                summary.appcast.as_deref(),
                Some("https://example.com/sparkle/2/appcast.xml")
            );
            assert_eq!(
                summary.artifacts,
                vec![
                    Artifact {
                        stanza: "app".to_string(),
                        value: "Example 2.0.app".to_string(),
                        target: Some("Example.app".to_string()),
                    },
                    Artifact {
                        stanza: "app".to_string(),
                        value: "Example 2.0 Uninstaller.app".to_string(),
                        target: None,
                    },
                    Artifact {
                        stanza: "binary".to_string(),
                        value: "#{appdir}/Example 2.0.app/Contents/MacOS/example-one".to_string(),
                        target: Some("example".to_string()),
                    },
                ]
            );
        }

        it "expand each branch with its own version" {
            let manifest = fixture("example-two.rb");
            let summaries: Vec<ContextSummary> =
                resolve(&manifest).iter().map(ContextSummary::from).collect();
            assert_eq!(summaries[0].url.as_deref(), Some("https://example.com/app_1.5.0.pkg"));
            assert_eq!(summaries[1].url.as_deref(), Some("https://example.com/app_2.0.0.pkg"));
            assert_eq!(
                summaries[0].appcast.as_deref(),
                Some("https://example.com/sparkle/1.5.0/el_capitan.xml")
            );
            assert_eq!(
                summaries[1].appcast.as_deref(),
                Some("https://example.com/sparkle/2/appcast.xml")
            );
            for summary in &summaries {
                assert_eq!(summary.homepage.as_deref(), Some("https://example.com/"));
            }
            assert_eq!(summaries[0].artifacts[0].value, "app_1.5.0.pkg");
            assert_eq!(summaries[1].artifacts[0].value, "app_2.0.0.pkg");
            assert_eq!(summaries[1].artifacts[0].stanza, "pkg");
        }
    }
}
