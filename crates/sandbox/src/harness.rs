//! Generated check module run inside the sandbox subprocess.
//!
//! The harness loads the bundle as an ES module and asserts its structural
//! contract at load time: an `allowRead` predicate, an `allowWrite`
//! predicate, and a default export that is a machine definition whose
//! state graph fully dereferences. Any failed assertion writes a single
//! diagnostic line to stderr and exits non-zero.

/// Builds the harness module source for a bundle at `bundle_url`
/// (a `file://` URL).
pub fn harness_script(bundle_url: &str) -> String {
    format!(
        r#"const exit = (code) => (globalThis.Deno ? Deno.exit(code) : process.exit(code));
const fail = (message) => {{
  console.error(message);
  exit(1);
}};

let mod;
try {{
  mod = await import({bundle_url:?});
}} catch (error) {{
  fail(`bundle failed to load: ${{error.message}}`);
}}

if (typeof mod.allowRead !== "function") {{
  fail("bundle does not export an allowRead function");
}}
if (typeof mod.allowWrite !== "function") {{
  fail("bundle does not export an allowWrite function");
}}

const definition = mod.default;
if (!definition || definition.__machineDefinition !== true) {{
  fail("default export is not a machine definition");
}}

try {{
  definition.resolve();
}} catch (error) {{
  fail(`machine definition does not resolve: ${{error.message}}`);
}}

exit(0);
"#
    )
}
