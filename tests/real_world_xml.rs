//! Edits against real-world XML formats.
//!
//! These serve as smoke tests ensuring the editor handles common patterns
//! found in Maven POMs, Android manifests, SOAP envelopes, servlet
//! descriptors, and documents with unusual content.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;

use xmledit::codec::{TreeCodec, XmlCodec};
use xmledit::edit::Operation;
use xmledit::serial::{serialize_with_options, SerializeOptions};
use xmledit::xpath::{parse, resolve};
use xmledit::{Document, Editor};

fn apply(doc: &mut Document, xpath: &str, operation: Operation) -> bool {
    Editor::new()
        .apply_to_document(doc, xpath, &operation)
        .unwrap_or_else(|e| panic!("{xpath}: {e}"))
        .changed
}

/// Saves and reloads the document, checking that a second save is identical.
fn save_and_reload(doc: &Document) -> (String, Document) {
    let options = SerializeOptions::default().indent(true);
    let output = serialize_with_options(doc, &options);
    let reloaded =
        Document::parse_str(&output).unwrap_or_else(|e| panic!("reload failed: {e}\n{output}"));
    assert_eq!(serialize_with_options(&reloaded, &options), output);
    (output, reloaded)
}

fn text_at(doc: &Document, xpath: &str) -> String {
    let id = resolve(doc, &parse(xpath).unwrap())
        .first()
        .unwrap_or_else(|| panic!("{xpath} matches nothing"));
    doc.element_text(id)
}

// --- Maven POM ---

const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>my-app</artifactId>
  <version>1.0-SNAPSHOT</version>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
  <build>
    <plugins>
      <plugin>
        <artifactId>maven-compiler-plugin</artifactId>
        <configuration>
          <source>11</source>
          <target>11</target>
        </configuration>
      </plugin>
    </plugins>
  </build>
</project>"#;

#[test]
fn test_maven_pom_release() {
    let mut doc = Document::parse_str(POM).unwrap();

    assert!(apply(&mut doc, "/project/version[1]", Operation::Upsert("1.0.0".into())));
    assert!(apply(
        &mut doc,
        "//dependencies/dependency[1]/version[1]",
        Operation::Upsert("4.13.3".into())
    ));
    assert!(apply(
        &mut doc,
        "//configuration/target[text()='11']",
        Operation::Upsert("17".into())
    ));
    assert!(!apply(
        &mut doc,
        "//configuration/target",
        Operation::Upsert("17".into())
    ));

    let (output, reloaded) = save_and_reload(&doc);
    assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project"));
    assert_eq!(text_at(&reloaded, "/project/version"), "1.0.0");
    assert_eq!(text_at(&reloaded, "//dependency/version"), "4.13.3");
    assert_eq!(text_at(&reloaded, "//configuration/source"), "11");
    assert_eq!(text_at(&reloaded, "//configuration/target"), "17");
}

#[test]
fn test_maven_pom_add_dependency_block() {
    let mut doc = Document::parse_str(POM).unwrap();
    let block = "<dependency>\n  <groupId>org.slf4j</groupId>\n  <artifactId>slf4j-api</artifactId>\n</dependency>";

    assert!(apply(&mut doc, "//dependencies/dependency[1]", Operation::InsertRaw(block.into())));
    let (output, reloaded) = save_and_reload(&doc);
    assert!(output.contains(
        "    </dependency>\n    <dependency>\n      <groupId>org.slf4j</groupId>\n"
    ));
    let deps = resolve(&reloaded, &parse("//dependencies/dependency").unwrap());
    assert_eq!(deps.len(), 2);
    assert_eq!(text_at(&reloaded, "//dependency[2]/artifactId"), "slf4j-api");
}

// --- Android Manifest ---

#[test]
fn test_android_manifest_prefixed_attributes() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
          package="com.example.app">
  <uses-permission android:name="android.permission.INTERNET"/>
  <application
      android:label="My App"
      android:icon="@mipmap/ic_launcher">
    <activity
        android:name=".MainActivity"
        android:exported="true">
      <intent-filter>
        <action android:name="android.intent.action.MAIN"/>
      </intent-filter>
    </activity>
  </application>
</manifest>"#;

    let mut doc = Document::parse_str(xml).unwrap();
    assert!(apply(
        &mut doc,
        "//activity[@android:name='.MainActivity']/@android:exported",
        Operation::Upsert("false".into())
    ));
    assert!(apply(
        &mut doc,
        "/manifest/application/@android:debuggable",
        Operation::Upsert("false".into())
    ));
    assert!(apply(&mut doc, "//uses-permission", Operation::Delete));

    let (output, reloaded) = save_and_reload(&doc);
    assert!(output.contains(
        "<application android:label=\"My App\" android:icon=\"@mipmap/ic_launcher\" android:debuggable=\"false\">"
    ));
    assert!(!output.contains("uses-permission"));
    let activity = resolve(&reloaded, &parse("//activity").unwrap()).first().unwrap();
    assert_eq!(reloaded.attribute(activity, "android:exported"), Some("false"));
}

// --- SOAP Envelope (multiple namespaces) ---

#[test]
fn test_soap_envelope_rename() {
    let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <GetUserResponse xmlns="http://example.com/api">
      <user>
        <name>Jane Doe</name>
        <email>jane@example.com</email>
      </user>
    </GetUserResponse>
  </soap:Body>
</soap:Envelope>"#;

    let mut doc = Document::parse_str(xml).unwrap();
    assert!(apply(
        &mut doc,
        "/soap:Envelope/soap:Body/GetUserResponse/user/email",
        Operation::Rename("mail".into())
    ));
    assert!(!apply(&mut doc, "//user/mail", Operation::Rename("mail".into())));

    let (_, reloaded) = save_and_reload(&doc);
    assert_eq!(text_at(&reloaded, "//user/mail"), "jane@example.com");
    assert!(resolve(&reloaded, &parse("//user/email").unwrap()).is_empty());
}

// --- Servlet descriptor ---

#[test]
fn test_web_xml_remove_mapping() {
    let xml = r"<web-app>
  <servlet-mapping>
    <servlet-name>api</servlet-name>
    <url-pattern>/api/*</url-pattern>
  </servlet-mapping>
  <servlet-mapping>
    <servlet-name>legacy</servlet-name>
    <url-pattern>/old/*</url-pattern>
  </servlet-mapping>
  <session-config>
    <session-timeout>30</session-timeout>
  </session-config>
</web-app>";

    let mut doc = Document::parse_str(xml).unwrap();
    assert!(apply(&mut doc, "/web-app/servlet-mapping[2]", Operation::Delete));
    assert!(apply(
        &mut doc,
        "//session-config/session-timeout[1]",
        Operation::Upsert("60".into())
    ));

    let (output, _) = save_and_reload(&doc);
    assert_eq!(
        output,
        "<web-app>\n  <servlet-mapping>\n    <servlet-name>api</servlet-name>\n    \
         <url-pattern>/api/*</url-pattern>\n  </servlet-mapping>\n  <session-config>\n    \
         <session-timeout>60</session-timeout>\n  </session-config>\n</web-app>\n"
    );
}

// --- Edge cases ---

#[test]
fn test_cdata_text_matches_and_is_replaced() {
    let xml = "<page><script><![CDATA[if (a < b) run();]]></script><p>Hi &amp; bye</p></page>";
    let mut doc = Document::parse_str(xml).unwrap();

    assert!(!apply(
        &mut doc,
        "//page/script",
        Operation::Upsert("if (a < b) run();".into())
    ));
    assert!(!apply(&mut doc, "//page/p", Operation::Upsert("Hi & bye".into())));
    assert!(apply(
        &mut doc,
        "//page/script[1]",
        Operation::Upsert("a && b".into())
    ));

    let (output, _) = save_and_reload(&doc);
    assert!(output.contains("<script>a &amp;&amp; b</script>"));
    assert!(output.contains("<p>Hi &amp; bye</p>"));
}

#[test]
fn test_deeply_nested() {
    use std::fmt::Write;
    let mut xml = String::new();
    for i in 0..50 {
        let _ = write!(xml, "<level{i}>");
    }
    xml.push_str("leaf");
    for i in (0..50).rev() {
        let _ = write!(xml, "</level{i}>");
    }

    let mut doc = Document::parse_str(&xml).unwrap();
    assert!(apply(
        &mut doc,
        "//level48/level49[text()='leaf']",
        Operation::Upsert("changed".into())
    ));
    assert_eq!(text_at(&doc, "//level49"), "changed");
}

#[test]
fn test_many_attributes_rename_moves_key_last() {
    use std::fmt::Write;
    let mut xml = String::from("<root");
    for i in 0..100 {
        let _ = write!(xml, " attr{i}=\"value{i}\"");
    }
    xml.push_str("/>");

    let mut doc = Document::parse_str(&xml).unwrap();
    assert!(apply(&mut doc, "/root/@attr0", Operation::Rename("first".into())));
    let root = doc.root_element().unwrap();
    let attrs = doc.attributes(root);
    assert_eq!(attrs.len(), 100);
    assert_eq!(attrs[0].name, "attr1");
    assert_eq!(attrs[99].name, "first");
    assert_eq!(attrs[99].value, "value0");
}

#[test]
fn test_unicode_predicates() {
    let xml = r"<root>
  <greeting lang='ja'>日本語テスト</greeting>
  <greeting lang='en'>Hello 🌍</greeting>
</root>";

    let mut doc = Document::parse_str(xml).unwrap();
    assert!(apply(
        &mut doc,
        "//greeting[text()='Hello 🌍']/@checked",
        Operation::Upsert("✓".into())
    ));
    let en = resolve(&doc, &parse("//greeting[@lang='en']").unwrap())
        .first()
        .unwrap();
    assert_eq!(doc.attribute(en, "checked"), Some("✓"));
}

#[test]
fn test_xml_with_byte_order_mark() {
    let codec = XmlCodec::default();
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"<root><v>hello</v></root>");

    let mut doc = codec.load(&bytes).unwrap_or_else(|e| panic!("load failed: {e}"));
    assert!(apply(&mut doc, "v[1]", Operation::Upsert("bye".into())));
    assert_eq!(codec.save(&doc).unwrap(), b"<root>\n  <v>bye</v>\n</root>\n");
}

#[test]
fn test_comments_and_instructions_survive_edits() {
    let xml = "<?xml version=\"1.0\"?>\n<!-- generated -->\n<?app mode=\"strict\"?>\n\
               <cfg>\n  <!-- timeouts -->\n  <timeout>5</timeout>\n</cfg>";
    let mut doc = Document::parse_str(xml).unwrap();
    assert!(apply(&mut doc, "//cfg/timeout[1]", Operation::Upsert("10".into())));

    let (output, _) = save_and_reload(&doc);
    assert_eq!(
        output,
        "<?xml version=\"1.0\"?>\n<!-- generated -->\n<?app mode=\"strict\"?>\n\
         <cfg>\n  <!-- timeouts -->\n  <timeout>10</timeout>\n</cfg>\n"
    );
}
