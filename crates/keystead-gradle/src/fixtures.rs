//! Build scripts shared by tests

/// Flutter app module signed from CI variables, with `key.properties` as fallback
pub const FLUTTER_KTS: &str = r#"import java.util.Properties
import java.io.FileInputStream
plugins {
    id("com.android.application")
    id("kotlin-android")
    // The Flutter Gradle Plugin must be applied after the Android and Kotlin Gradle plugins.
    id("dev.flutter.flutter-gradle-plugin")
}
val keystoreProperties = Properties()
val keystorePropertiesFile = rootProject.file("key.properties")
if (keystorePropertiesFile.exists()) {
    keystoreProperties.load(FileInputStream(keystorePropertiesFile))
}
android {
    namespace = "com.example.darvin_app"
    compileSdk = 36
    ndkVersion = "27.0.12077973"

    compileOptions {
        sourceCompatibility = JavaVersion.VERSION_11
        targetCompatibility = JavaVersion.VERSION_11
    }

    defaultConfig {
        applicationId = "com.example.darvin_app"
        minSdk = 26 // Android 8.0
        targetSdk = 36
        versionCode = flutter.versionCode
        versionName = flutter.versionName
    }

    signingConfigs {
        create("release") {
            keyAlias = System.getenv("BITRISEIO_ANDROID_KEYSTORE_ALIAS") ?: keystoreProperties["keyAlias"] as String?
            keyPassword = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PRIVATE_KEY_PASSWORD") ?: keystoreProperties["keyPassword"] as String?
            storeFile = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PATH")?.let { file(it) }
            storePassword = System.getenv("BITRISEIO_ANDROID_KEYSTORE_PASSWORD") ?: keystoreProperties["storePassword"] as String?
        }
    }

    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("release")
        }
    }
}
flutter {
    source = "../.."
}
"#;

/// Groovy app module signed only from `key.properties`, release pointing at the debug key
pub const FLUTTER_GROOVY: &str = r#"plugins {
    id "com.android.application"
    id "dev.flutter.flutter-gradle-plugin"
}

def keystoreProperties = new Properties()
def keystorePropertiesFile = rootProject.file('key.properties')
keystoreProperties.load(new FileInputStream(keystorePropertiesFile))

android {
    namespace "com.example.app"
    compileSdkVersion flutter.compileSdkVersion

    defaultConfig {
        applicationId "com.example.app"
        minSdkVersion flutter.minSdkVersion
        targetSdkVersion 34
    }

    signingConfigs {
        release {
            keyAlias keystoreProperties['keyAlias']
            keyPassword keystoreProperties['keyPassword']
            storeFile keystoreProperties['storeFile'] ? file(keystoreProperties['storeFile']) : null
            storePassword keystoreProperties['storePassword']
        }
    }

    buildTypes {
        release {
            signingConfig signingConfigs.debug
            minifyEnabled true
            shrinkResources false
        }
    }
}
"#;

/// Kotlin app module with a secret passed as a variable name and hardcoded passwords
pub const HARDCODED_KTS: &str = r#"plugins {
    id("com.android.application")
}

android {
    namespace = "com.example.hardcoded"
    compileSdk = flutter.compileSdkVersion

    signingConfigs {
        create("release") {
            storeFile = file("/Users/dev/keys/upload-keystore.jks")
            storePassword = System.getenv("Darvin@2024!")
            keyAlias = "upload"
            keyPassword = System.getenv("KEY_PASSWORD") ?: "android123"
        }
        create("staging") {
            storeFile = file(stagingProperties["storeFile"])
            keyAlias = "staging"
        }
    }

    buildTypes {
        release {
            signingConfig = signingConfigs.getByName("release")
            isMinifyEnabled = true
        }
        create("qa") {
            signingConfig = signingConfigs.getByName("qa")
        }
    }
}
"#;
